//! Pairwise radiative exchange
//!
//! Cheap view-factor approximation over every pair of local particles,
//! independent of contact:
//!
//! ```text
//! d*  = r / (2 R_j)
//! VF  = -5.2e-5 + 0.064 / d*²
//! Q   = σ · VF · (T_j⁴ - T_i⁴) · 4π R_j²
//! ```
//!
//! No shadowing or multiple reflection. The distance is normalised by the
//! second particle's radius only, so `Q(i,j)` and `Q(j,i)` differ for unequal
//! radii; callers always evaluate a pair with `i < j`.

/// Stefan-Boltzmann constant (W/(m²·K⁴))
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;

/// π as used in the sphere surface area of the view-factor model.
/// Kept at this precision so results match existing reference runs.
const SPHERE_AREA_PI: f64 = 3.1415926;

/// Approximate view factor at centre distance `r` from a sphere of radius `radj`.
#[inline]
pub fn view_factor(r: f64, radj: f64) -> f64 {
    let disless = r / (2.0 * radj);
    -5.2e-5 + 0.064 / (disless * disless)
}

/// Radiative heat flowing into particle i from particle j.
#[inline]
pub fn radiative_flux(r: f64, radj: f64, temp_i: f64, temp_j: f64) -> f64 {
    let vf = view_factor(r, radj);
    let temp_i4 = temp_i * temp_i * temp_i * temp_i;
    let temp_j4 = temp_j * temp_j * temp_j * temp_j;
    let area_j = 4.0 * SPHERE_AREA_PI * radj * radj;
    STEFAN_BOLTZMANN * vf * (temp_j4 - temp_i4) * area_j
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_factor_at_contact() {
        // d* = 1 for touching equal spheres
        assert_relative_eq!(view_factor(2.0, 1.0), 0.064 - 5.2e-5);
        // quarter at twice the distance
        assert_relative_eq!(view_factor(4.0, 1.0), 0.016 - 5.2e-5);
    }

    #[test]
    fn test_zero_for_equal_temperatures() {
        assert_eq!(radiative_flux(3.0, 0.5, 850.0, 850.0), 0.0);
    }

    #[test]
    fn test_sign_flips_on_temperature_swap() {
        let forward = radiative_flux(2.5, 1.0, 400.0, 300.0);
        let swapped = radiative_flux(2.5, 1.0, 300.0, 400.0);
        assert!(forward < 0.0);
        assert_eq!(forward, -swapped);
    }

    #[test]
    fn test_hand_computed_value() {
        let r = 1.8;
        let vf = -5.2e-5 + 0.064 / (0.9 * 0.9);
        let expected = 5.67e-8 * vf * (300.0_f64.powi(4) - 400.0_f64.powi(4)) * 4.0 * 3.1415926;
        assert_relative_eq!(radiative_flux(r, 1.0, 400.0, 300.0), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_normalised_by_second_radius() {
        let a = radiative_flux(3.0, 1.0, 500.0, 300.0);
        let b = radiative_flux(3.0, 0.5, 500.0, 300.0);
        assert_ne!(a, b);
    }
}
