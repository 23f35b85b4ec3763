//! Per-type material tables
//!
//! Built once per `init()` from the host's per-type property source:
//! - [`MaterialTable`]: base thermal conductivity per particle type
//! - [`AreaCorrectionTable`]: overlap scaling ratio per ordered type pair
//!
//! # Area correction
//!
//! Granular contact models are often run with a softened Young's modulus to
//! allow larger timesteps. The softer material overlaps more, which inflates
//! the conduction contact area. The ratio
//!
//! ```text
//! Y_eff(i,j)  = 1 / ((1 - ν_i²)/Y_i + (1 - ν_j²)/Y_j)
//! ratio(i,j)  = (Y_eff / Y_eff,orig) ^ (1 / stress_strain_exponent)
//! ```
//!
//! rescales the overlap back to what the original stiffness would produce.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::HeatGranError;

pub const THERMAL_CONDUCTIVITY: &str = "thermalConductivity";
pub const YOUNGS_MODULUS: &str = "youngsModulus";
pub const POISSONS_RATIO: &str = "poissonsRatio";
pub const YOUNGS_MODULUS_ORIGINAL: &str = "youngsModulusOriginal";

/// Host-side source of per-type scalar properties.
pub trait MaterialSource {
    /// Values for types `1..=max_type`, indexed from 0.
    ///
    /// # Errors
    /// The property is missing or has fewer than `max_type` values.
    fn per_type(&self, name: &str, max_type: usize) -> Result<&[f64], HeatGranError>;
}

/// In-memory per-type property registry.
#[derive(Debug, Clone, Default)]
pub struct MaterialProperties {
    values: FxHashMap<String, Vec<f64>>,
}

impl MaterialProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace a per-type property.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<f64>) -> &mut Self {
        self.values.insert(name.into(), values);
        self
    }

    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.set(name, values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }
}

impl MaterialSource for MaterialProperties {
    fn per_type(&self, name: &str, max_type: usize) -> Result<&[f64], HeatGranError> {
        let values = self
            .get(name)
            .ok_or_else(|| HeatGranError::MissingProperty(name.to_string()))?;
        if values.len() < max_type {
            return Err(HeatGranError::PropertyLength {
                name: name.to_string(),
                expected: max_type,
                actual: values.len(),
            });
        }
        Ok(&values[..max_type])
    }
}

/// The contact-force model active in the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStyle {
    pub name: String,
    /// Exponent of the force/overlap law (Hooke 1.0, Hertz 1.5); granular styles only
    pub stress_strain_exponent: Option<f64>,
}

impl PairStyle {
    pub fn granular(name: impl Into<String>, stress_strain_exponent: f64) -> Self {
        Self {
            name: name.into(),
            stress_strain_exponent: Some(stress_strain_exponent),
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stress_strain_exponent: None,
        }
    }

    pub fn is_granular(&self) -> bool {
        self.name.contains("gran") && self.stress_strain_exponent.is_some()
    }

    /// Composite styles where this module's results are not guaranteed.
    pub fn is_hybrid(&self) -> bool {
        self.name == "hybrid" || self.name == "hybrid/overlay"
    }
}

/// Base conductivity per particle type.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTable {
    conductivity: Vec<f64>,
}

impl MaterialTable {
    /// Build from per-type conductivities (index 0 is type 1).
    ///
    /// # Errors
    /// [`HeatGranError::NegativeConductivity`] for any value below zero or NaN.
    pub fn new(conductivity: &[f64]) -> Result<Self, HeatGranError> {
        if let Some((idx, &value)) = conductivity
            .iter()
            .enumerate()
            .find(|(_, &k)| k.is_nan() || k < 0.0)
        {
            return Err(HeatGranError::NegativeConductivity {
                particle_type: idx + 1,
                value,
            });
        }
        Ok(Self {
            conductivity: conductivity.to_vec(),
        })
    }

    /// # Errors
    /// Propagates lookup failures of `source` and negative values.
    pub fn from_source(
        source: &dyn MaterialSource,
        max_type: usize,
    ) -> Result<Self, HeatGranError> {
        Self::new(source.per_type(THERMAL_CONDUCTIVITY, max_type)?)
    }

    #[inline]
    pub fn max_type(&self) -> usize {
        self.conductivity.len()
    }

    /// Base conductivity of a 1-based particle type.
    #[inline]
    pub fn conductivity(&self, particle_type: u32) -> f64 {
        self.conductivity[particle_type as usize - 1]
    }
}

/// Overlap scaling ratio per ordered type pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaCorrectionTable {
    max_type: usize,
    ratio: Vec<f64>,
}

impl AreaCorrectionTable {
    /// Compute the ratio for every ordered pair of types.
    ///
    /// # Errors
    /// [`HeatGranError::InvalidStressStrainExponent`] if the exponent is not finite and > 0,
    /// [`HeatGranError::PropertyLength`] if the slices differ in length.
    pub fn new(
        youngs_modulus: &[f64],
        poissons_ratio: &[f64],
        youngs_modulus_original: &[f64],
        stress_strain_exponent: f64,
    ) -> Result<Self, HeatGranError> {
        if !stress_strain_exponent.is_finite() || stress_strain_exponent <= 0.0 {
            return Err(HeatGranError::InvalidStressStrainExponent(
                stress_strain_exponent,
            ));
        }
        let max_type = youngs_modulus.len();
        for (name, values) in [
            (POISSONS_RATIO, poissons_ratio),
            (YOUNGS_MODULUS_ORIGINAL, youngs_modulus_original),
        ] {
            if values.len() != max_type {
                return Err(HeatGranError::PropertyLength {
                    name: name.to_string(),
                    expected: max_type,
                    actual: values.len(),
                });
            }
        }
        let expo = 1.0 / stress_strain_exponent;
        let mut ratio = vec![0.0; max_type * max_type];

        for i in 0..max_type {
            for j in 0..max_type {
                let yeff = effective_modulus(
                    youngs_modulus[i],
                    poissons_ratio[i],
                    youngs_modulus[j],
                    poissons_ratio[j],
                );
                let yeff_orig = effective_modulus(
                    youngs_modulus_original[i],
                    poissons_ratio[i],
                    youngs_modulus_original[j],
                    poissons_ratio[j],
                );
                ratio[i * max_type + j] = (yeff / yeff_orig).powf(expo);
            }
        }

        Ok(Self { max_type, ratio })
    }

    /// Build from the host's properties and the active contact model.
    ///
    /// # Errors
    /// [`HeatGranError::AreaCorrectionRequiresGranular`] if `pair_style` is not granular,
    /// plus any property lookup failure.
    pub fn from_source(
        source: &dyn MaterialSource,
        pair_style: &PairStyle,
        max_type: usize,
    ) -> Result<Self, HeatGranError> {
        let exponent = match pair_style.stress_strain_exponent {
            Some(e) if pair_style.is_granular() => e,
            _ => {
                return Err(HeatGranError::AreaCorrectionRequiresGranular {
                    pair_style: pair_style.name.clone(),
                })
            }
        };
        Self::new(
            source.per_type(YOUNGS_MODULUS, max_type)?,
            source.per_type(POISSONS_RATIO, max_type)?,
            source.per_type(YOUNGS_MODULUS_ORIGINAL, max_type)?,
            exponent,
        )
    }

    /// Ratio for the ordered pair of 1-based types.
    #[inline]
    pub fn ratio(&self, type_i: u32, type_j: u32) -> f64 {
        self.ratio[(type_i as usize - 1) * self.max_type + (type_j as usize - 1)]
    }
}

#[inline]
fn effective_modulus(y_i: f64, nu_i: f64, y_j: f64, nu_j: f64) -> f64 {
    1.0 / ((1.0 - nu_i.powi(2)) / y_i + (1.0 - nu_j.powi(2)) / y_j)
}

/// Everything `init()` produces.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTables {
    pub conductivity: MaterialTable,
    pub area_correction: Option<AreaCorrectionTable>,
}

impl MaterialTables {
    /// # Errors
    /// See [`MaterialTable::from_source`] and [`AreaCorrectionTable::from_source`].
    pub fn build(
        source: &dyn MaterialSource,
        pair_style: &PairStyle,
        max_type: usize,
        area_correction: bool,
    ) -> Result<Self, HeatGranError> {
        let conductivity = MaterialTable::from_source(source, max_type)?;
        let area_correction = if area_correction {
            Some(AreaCorrectionTable::from_source(source, pair_style, max_type)?)
        } else {
            None
        };
        debug!(
            max_type,
            area_correction = area_correction.is_some(),
            "Built material tables"
        );
        Ok(Self {
            conductivity,
            area_correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_type_props() -> MaterialProperties {
        MaterialProperties::new()
            .with(THERMAL_CONDUCTIVITY, vec![1.0, 0.5])
            .with(YOUNGS_MODULUS, vec![5.0e6, 1.0e7])
            .with(POISSONS_RATIO, vec![0.25, 0.3])
            .with(YOUNGS_MODULUS_ORIGINAL, vec![5.0e8, 1.0e9])
    }

    #[test]
    fn test_negative_conductivity_is_fatal() {
        let err = MaterialTable::new(&[1.0, -0.1]).unwrap_err();
        assert_eq!(
            err,
            HeatGranError::NegativeConductivity {
                particle_type: 2,
                value: -0.1
            }
        );
    }

    #[test]
    fn test_conductivity_lookup_is_one_based() {
        let table = MaterialTable::from_source(&two_type_props(), 2).unwrap();
        assert_eq!(table.max_type(), 2);
        assert_eq!(table.conductivity(1), 1.0);
        assert_eq!(table.conductivity(2), 0.5);
    }

    #[test]
    fn test_missing_and_short_properties() {
        let props = MaterialProperties::new().with(THERMAL_CONDUCTIVITY, vec![1.0]);
        assert!(matches!(
            MaterialTable::from_source(&props, 2),
            Err(HeatGranError::PropertyLength { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            props.per_type(YOUNGS_MODULUS, 1),
            Err(HeatGranError::MissingProperty(_))
        ));
    }

    #[test]
    fn test_area_correction_hertz_ratio() {
        // Same scale factor of 100 on every modulus: Y_eff scales by 1/100 as well
        let table = AreaCorrectionTable::from_source(
            &two_type_props(),
            &PairStyle::granular("gran/hertz/history", 1.5),
            2,
        )
        .unwrap();
        let expected = 0.01_f64.powf(1.0 / 1.5);
        assert_relative_eq!(table.ratio(1, 1), expected, max_relative = 1e-12);
        assert_relative_eq!(table.ratio(1, 2), expected, max_relative = 1e-12);
        assert_relative_eq!(table.ratio(2, 2), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_area_correction_is_symmetric() {
        let props = MaterialProperties::new()
            .with(YOUNGS_MODULUS, vec![1.0e7, 3.0e7, 2.0e6])
            .with(POISSONS_RATIO, vec![0.2, 0.35, 0.45])
            .with(YOUNGS_MODULUS_ORIGINAL, vec![7.0e9, 2.0e8, 1.0e8]);
        let table =
            AreaCorrectionTable::from_source(&props, &PairStyle::granular("gran/hooke", 1.0), 3)
                .unwrap();
        for i in 1..=3 {
            for j in 1..=3 {
                assert_eq!(table.ratio(i, j), table.ratio(j, i));
            }
        }
        // Unchanged modulus on both sides gives no correction
        let identity = AreaCorrectionTable::new(&[1.0e7], &[0.3], &[1.0e7], 1.5).unwrap();
        assert_relative_eq!(identity.ratio(1, 1), 1.0);
    }

    #[test]
    fn test_area_correction_requires_granular_style() {
        let err =
            AreaCorrectionTable::from_source(&two_type_props(), &PairStyle::other("lj/cut"), 2)
                .unwrap_err();
        assert_eq!(
            err,
            HeatGranError::AreaCorrectionRequiresGranular {
                pair_style: "lj/cut".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_exponent() {
        assert!(matches!(
            AreaCorrectionTable::new(&[1.0], &[0.3], &[1.0], 0.0),
            Err(HeatGranError::InvalidStressStrainExponent(_))
        ));
    }

    #[test]
    fn test_mismatched_property_lengths() {
        let err = AreaCorrectionTable::new(&[1.0e7, 2.0e7], &[0.3], &[1.0e8, 1.0e8], 1.5)
            .unwrap_err();
        assert_eq!(
            err,
            HeatGranError::PropertyLength {
                name: POISSONS_RATIO.to_string(),
                expected: 2,
                actual: 1,
            }
        );
        assert!(matches!(
            AreaCorrectionTable::new(&[1.0e7], &[0.3], &[1.0e8, 1.0e8], 1.5),
            Err(HeatGranError::PropertyLength { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_nan_conductivity_is_fatal() {
        let err = MaterialTable::new(&[0.5, f64::NAN]).unwrap_err();
        assert!(matches!(
            err,
            HeatGranError::NegativeConductivity { particle_type: 2, value } if value.is_nan()
        ));
    }

    #[test]
    fn test_hybrid_detection() {
        assert!(PairStyle::other("hybrid/overlay").is_hybrid());
        assert!(PairStyle::other("hybrid").is_hybrid());
        assert!(!PairStyle::granular("gran/hertz/history", 1.5).is_hybrid());
    }

    #[test]
    fn test_tables_build_without_correction() {
        let tables = MaterialTables::build(&two_type_props(), &PairStyle::other("lj/cut"), 2, false)
            .unwrap();
        assert!(tables.area_correction.is_none());
        assert_eq!(tables.conductivity.conductivity(2), 0.5);
    }
}
