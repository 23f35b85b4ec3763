//! Contact detection and conduction contact area
//!
//! Contact exists iff the squared centre distance is below the squared sum of
//! radii. The effective conduction cross-section then depends on the
//! configured [`ContactAreaMode`]:
//!
//! - **Overlap**: area of the lens where the two sphere surfaces intersect,
//!   `πa²` with
//!   ```text
//!   a² = -(r-Ri-Rj)(r+Ri-Rj)(r-Ri+Rj)(r+Ri+Rj) / (4r²)
//!   ```
//!   or `π·min(Ri,Rj)²` once the centre distance drops below the larger radius.
//! - **Constant**: the configured area for every contact.
//! - **Projection**: `π·max(Ri,Rj)²`, independent of penetration depth.

use std::f64::consts::PI;

use crate::config::ContactAreaMode;
use crate::core_types::Vec3;

/// Geometry of one particle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairGeometry {
    /// Displacement from j to i (`x_i - x_j`)
    pub del: Vec3,
    /// Squared centre distance
    pub rsq: f64,
    pub radi: f64,
    pub radj: f64,
}

impl PairGeometry {
    #[inline]
    pub fn new(xi: &[f64; 3], xj: &[f64; 3], radi: f64, radj: f64) -> Self {
        let del = Vec3::from(*xi) - Vec3::from(*xj);
        Self {
            del,
            rsq: del.x * del.x + del.y * del.y + del.z * del.z,
            radi,
            radj,
        }
    }

    #[inline]
    pub fn radsum(&self) -> f64 {
        self.radi + self.radj
    }

    /// Centre distance.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.rsq.sqrt()
    }

    #[inline]
    pub fn in_contact(&self) -> bool {
        let radsum = self.radsum();
        self.rsq < radsum * radsum
    }
}

/// Conduction contact area of a pair already known to be in contact.
///
/// `area_ratio` is the stiffness correction for the pair's types; it only
/// applies in overlap mode.
#[inline]
pub fn contact_area(mode: ContactAreaMode, geom: &PairGeometry, area_ratio: Option<f64>) -> f64 {
    match mode {
        ContactAreaMode::Overlap => {
            let mut r = geom.distance();
            if let Some(ratio) = area_ratio {
                let radsum = geom.radsum();
                let delta_n = (radsum - r) * ratio;
                r = radsum - delta_n;
            }
            overlap_area(r, geom.radi, geom.radj)
        }
        ContactAreaMode::Constant(area) => area,
        ContactAreaMode::Projection => {
            let rmax = geom.radi.max(geom.radj);
            PI * rmax * rmax
        }
    }
}

/// Lens area of two overlapping spheres at centre distance `r`.
#[inline]
pub fn overlap_area(r: f64, radi: f64, radj: f64) -> f64 {
    if r < radi.max(radj) {
        // one sphere is inside the other
        let rmin = radi.min(radj);
        rmin * rmin * PI
    } else {
        -PI / 4.0 * ((r - radi - radj) * (r + radi - radj) * (r - radi + radj) * (r + radi + radj))
            / (r * r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contact_detection() {
        let touching = PairGeometry::new(&[0.0, 0.0, 0.0], &[1.8, 0.0, 0.0], 1.0, 1.0);
        assert!(touching.in_contact());
        assert_relative_eq!(touching.distance(), 1.8);
        assert_eq!(touching.del, Vec3::new(-1.8, 0.0, 0.0));

        // Exactly touching surfaces are not a contact
        let grazing = PairGeometry::new(&[0.0, 0.0, 0.0], &[2.0, 0.0, 0.0], 1.0, 1.0);
        assert!(!grazing.in_contact());
    }

    #[test]
    fn test_overlap_area_equal_spheres() {
        // a² = R² - (r/2)² for equal radii
        let area = overlap_area(1.8, 1.0, 1.0);
        assert_relative_eq!(area, PI * (1.0 - 0.81), max_relative = 1e-12);
        assert_relative_eq!(area, 0.19 * PI, max_relative = 1e-12);
        assert!(area > 0.0);
    }

    #[test]
    fn test_overlap_area_vanishes_at_touching() {
        assert_relative_eq!(overlap_area(2.0, 1.0, 1.0), 0.0, epsilon = 1e-15);
        assert_relative_eq!(overlap_area(1.5, 1.0, 0.5), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_overlap_area_at_enclosure_boundary() {
        // Centre of the small sphere on the large sphere's surface:
        // a² = ρ²(1 - ρ²/(4R²)), approaching πρ² as ρ/R → 0
        let (big, small) = (1.0, 0.2);
        let just_outside = overlap_area(big, big, small);
        let expected = PI * small * small * (1.0 - small * small / (4.0 * big * big));
        assert_relative_eq!(just_outside, expected, max_relative = 1e-12);

        let inside = overlap_area(big - 1e-9, big, small);
        assert_relative_eq!(inside, PI * small * small, max_relative = 1e-12);
        assert!((inside - just_outside) / inside < 0.011);
    }

    #[test]
    fn test_area_correction_shrinks_overlap() {
        let geom = PairGeometry::new(&[0.0; 3], &[1.8, 0.0, 0.0], 1.0, 1.0);
        let raw = contact_area(ContactAreaMode::Overlap, &geom, None);
        let unit = contact_area(ContactAreaMode::Overlap, &geom, Some(1.0));
        let softened = contact_area(ContactAreaMode::Overlap, &geom, Some(0.5));

        assert_relative_eq!(raw, unit, max_relative = 1e-12);
        // corrected distance: 2 - 0.2 * 0.5 = 1.9
        assert_relative_eq!(softened, overlap_area(1.9, 1.0, 1.0), max_relative = 1e-12);
        assert!(softened < raw);
    }

    #[test]
    fn test_constant_area_ignores_geometry() {
        for sep in [0.5, 1.0, 1.5, 1.99] {
            let geom = PairGeometry::new(&[0.0; 3], &[sep, 0.0, 0.0], 1.0, 1.0);
            assert_eq!(contact_area(ContactAreaMode::Constant(0.5), &geom, None), 0.5);
        }
    }

    #[test]
    fn test_projection_area_uses_larger_radius_only() {
        let near = PairGeometry::new(&[0.0; 3], &[0.3, 0.0, 0.0], 0.5, 1.2);
        let far = PairGeometry::new(&[0.0; 3], &[1.6, 0.0, 0.0], 0.5, 1.2);
        let expected = PI * 1.2 * 1.2;
        assert_eq!(contact_area(ContactAreaMode::Projection, &near, None), expected);
        assert_eq!(contact_area(ContactAreaMode::Projection, &far, None), expected);
    }
}
