//! Module configuration
//!
//! Selected once when the module is created and immutable afterwards.
//! Hosts either build a [`HeatExchangeConfig`] directly, deserialize one, or
//! hand over the keyword tail of their command line to
//! [`HeatExchangeConfig::from_keywords`]:
//!
//! ```text
//! contact_area overlap | projection | constant <area>
//! area_correction yes | no
//! store_contact_data yes | no
//! parallel_radiation yes | no
//! ```

use serde::{Deserialize, Serialize};

use crate::error::HeatGranError;

/// How the conduction contact area of two touching spheres is computed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ContactAreaMode {
    /// Lens area from the actual overlap of the two spheres
    #[default]
    Overlap,
    /// Same fixed area for every contact
    Constant(f64),
    /// Cross-section of the larger sphere
    Projection,
}

impl ContactAreaMode {
    #[inline]
    pub fn is_overlap(&self) -> bool {
        matches!(self, Self::Overlap)
    }
}

/// Configuration of a [`crate::GranularHeatExchange`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatExchangeConfig {
    pub contact_area: ContactAreaMode,
    /// Scale the overlap by the stiffness correction ratio (overlap mode only)
    pub area_correction: bool,
    /// Keep per-particle contact area/count and wall coupling slots
    pub store_contact_data: bool,
    /// Evaluate the all-pairs radiation pass on the rayon pool
    pub parallel_radiation: bool,
}

impl HeatExchangeConfig {
    /// Check the cross-field rules.
    ///
    /// # Errors
    /// - [`HeatGranError::NonPositiveConstantArea`] for a constant area that is not finite and > 0
    /// - [`HeatGranError::AreaCorrectionRequiresOverlap`] for area correction outside overlap mode
    pub fn validate(&self) -> Result<(), HeatGranError> {
        if let ContactAreaMode::Constant(area) = self.contact_area {
            if !area.is_finite() || area <= 0.0 {
                return Err(HeatGranError::NonPositiveConstantArea(area));
            }
        }
        if self.area_correction && !self.contact_area.is_overlap() {
            return Err(HeatGranError::AreaCorrectionRequiresOverlap);
        }
        Ok(())
    }

    /// Parse a keyword/value argument tail.
    ///
    /// # Errors
    /// Any unknown keyword, missing or malformed value, or a combination
    /// rejected by [`HeatExchangeConfig::validate`].
    pub fn from_keywords<S: AsRef<str>>(args: &[S]) -> Result<Self, HeatGranError> {
        let mut config = Self::default();
        let mut iarg = 0;

        while iarg < args.len() {
            let keyword = args[iarg].as_ref();
            match keyword {
                "contact_area" => {
                    let mode = value_at(args, iarg + 1, keyword)?;
                    config.contact_area = match mode {
                        "overlap" => ContactAreaMode::Overlap,
                        "projection" => ContactAreaMode::Projection,
                        "constant" => {
                            let raw = value_at(args, iarg + 2, "contact_area constant")?;
                            let area = raw.parse::<f64>().map_err(|_| {
                                HeatGranError::InvalidKeywordValue {
                                    keyword: "contact_area constant".to_string(),
                                    value: raw.to_string(),
                                    expected: "a number",
                                }
                            })?;
                            if area <= 0.0 {
                                return Err(HeatGranError::NonPositiveConstantArea(area));
                            }
                            iarg += 1;
                            ContactAreaMode::Constant(area)
                        }
                        other => {
                            return Err(HeatGranError::InvalidKeywordValue {
                                keyword: keyword.to_string(),
                                value: other.to_string(),
                                expected: "'overlap', 'projection' or 'constant'",
                            })
                        }
                    };
                    iarg += 2;
                }
                "area_correction" => {
                    config.area_correction = yes_no(args, iarg + 1, keyword)?;
                    iarg += 2;
                }
                "store_contact_data" => {
                    config.store_contact_data = yes_no(args, iarg + 1, keyword)?;
                    iarg += 2;
                }
                "parallel_radiation" => {
                    config.parallel_radiation = yes_no(args, iarg + 1, keyword)?;
                    iarg += 2;
                }
                other => return Err(HeatGranError::UnknownKeyword(other.to_string())),
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn value_at<'a, S: AsRef<str>>(
    args: &'a [S],
    idx: usize,
    keyword: &str,
) -> Result<&'a str, HeatGranError> {
    args.get(idx)
        .map(AsRef::as_ref)
        .ok_or_else(|| HeatGranError::MissingKeywordArgument(keyword.to_string()))
}

fn yes_no<S: AsRef<str>>(args: &[S], idx: usize, keyword: &str) -> Result<bool, HeatGranError> {
    match value_at(args, idx, keyword)? {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(HeatGranError::InvalidKeywordValue {
            keyword: keyword.to_string(),
            value: other.to_string(),
            expected: "'yes' or 'no'",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HeatExchangeConfig::from_keywords::<&str>(&[]).unwrap();
        assert_eq!(config, HeatExchangeConfig::default());
        assert_eq!(config.contact_area, ContactAreaMode::Overlap);
        assert!(!config.area_correction);
        assert!(!config.store_contact_data);
    }

    #[test]
    fn test_parse_all_keywords() {
        let config = HeatExchangeConfig::from_keywords(&[
            "contact_area",
            "overlap",
            "area_correction",
            "yes",
            "store_contact_data",
            "yes",
            "parallel_radiation",
            "no",
        ])
        .unwrap();
        assert!(config.area_correction);
        assert!(config.store_contact_data);
        assert!(!config.parallel_radiation);
    }

    #[test]
    fn test_parse_constant_area() {
        let config = HeatExchangeConfig::from_keywords(&[
            "contact_area",
            "constant",
            "0.5",
            "store_contact_data",
            "no",
        ])
        .unwrap();
        assert_eq!(config.contact_area, ContactAreaMode::Constant(0.5));
    }

    #[test]
    fn test_constant_area_must_be_positive() {
        let err =
            HeatExchangeConfig::from_keywords(&["contact_area", "constant", "0"]).unwrap_err();
        assert_eq!(err, HeatGranError::NonPositiveConstantArea(0.0));

        let direct = HeatExchangeConfig {
            contact_area: ContactAreaMode::Constant(-1.0),
            ..Default::default()
        };
        assert!(direct.validate().is_err());
    }

    #[test]
    fn test_constant_area_needs_value() {
        let err = HeatExchangeConfig::from_keywords(&["contact_area", "constant"]).unwrap_err();
        assert!(matches!(err, HeatGranError::MissingKeywordArgument(_)));
    }

    #[test]
    fn test_area_correction_only_with_overlap() {
        let err = HeatExchangeConfig::from_keywords(&[
            "contact_area",
            "projection",
            "area_correction",
            "yes",
        ])
        .unwrap_err();
        assert_eq!(err, HeatGranError::AreaCorrectionRequiresOverlap);
    }

    #[test]
    fn test_unknown_keyword_is_fatal() {
        let err = HeatExchangeConfig::from_keywords(&["emissivity", "0.9"]).unwrap_err();
        assert_eq!(err, HeatGranError::UnknownKeyword("emissivity".to_string()));
    }

    #[test]
    fn test_bad_yes_no_value() {
        let err = HeatExchangeConfig::from_keywords(&["store_contact_data", "maybe"]).unwrap_err();
        assert!(matches!(
            err,
            HeatGranError::InvalidKeywordValue { expected: "'yes' or 'no'", .. }
        ));
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: HeatExchangeConfig = serde_json::from_str(
            r#"{"contact_area": {"mode": "constant", "value": 0.25}, "store_contact_data": true}"#,
        )
        .unwrap();
        assert_eq!(config.contact_area, ContactAreaMode::Constant(0.25));
        assert!(config.store_contact_data);
        assert!(!config.area_correction);

        let projection: HeatExchangeConfig =
            serde_json::from_str(r#"{"contact_area": {"mode": "projection"}}"#).unwrap();
        assert_eq!(projection.contact_area, ContactAreaMode::Projection);
    }
}
