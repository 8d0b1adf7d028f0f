//! Engine options shared by the calculator, selector and validator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported rounding precision (decimal places).
///
/// `10^9` ticks keeps `weight * scale` inside `u128` for any `u64` total.
pub const MAX_PRECISION: u32 = 9;

/// Errors from an out-of-range engine option.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("precision {precision} out of range (0..={max})")]
    PrecisionOutOfRange { precision: u32, max: u32 },

    #[error("{name} must be a finite value in [0, 1], got {value}")]
    ToleranceOutOfRange { name: &'static str, value: f64 },

    #[error("tolerance_accuracy ({accuracy}) must not exceed tolerance_max_frequency ({max_frequency})")]
    ToleranceOrder { accuracy: f64, max_frequency: f64 },

    #[error("engine config parse error: {0}")]
    Parse(String),
}

/// Recognised engine options with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decimal places probabilities are rounded to.
    pub precision: u32,
    /// Scan weights for negative entries before computing probabilities.
    pub validate_inputs: bool,
    /// Simulation deviation above which an INFO issue is raised.
    pub tolerance_accuracy: f64,
    /// Simulation deviation above which a WARNING issue is raised.
    pub tolerance_max_frequency: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            validate_inputs: true,
            tolerance_accuracy: 0.02,
            tolerance_max_frequency: 0.05,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionOutOfRange {
                precision: self.precision,
                max: MAX_PRECISION,
            });
        }
        check_unit("tolerance_accuracy", self.tolerance_accuracy)?;
        check_unit("tolerance_max_frequency", self.tolerance_max_frequency)?;
        if self.tolerance_accuracy > self.tolerance_max_frequency {
            return Err(ConfigError::ToleranceOrder {
                accuracy: self.tolerance_accuracy,
                max_frequency: self.tolerance_max_frequency,
            });
        }
        Ok(())
    }

    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ToleranceOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_reasonable() {
        let config = EngineConfig::default();
        assert_eq!(config.precision, 3);
        assert!(config.validate_inputs);
        assert!((config.tolerance_accuracy - 0.02).abs() < 1e-12);
        assert!((config.tolerance_max_frequency - 0.05).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn precision_above_max_rejected() {
        let config = EngineConfig {
            precision: 10,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PrecisionOutOfRange { precision: 10, max: 9 })
        );
    }

    #[test]
    fn tolerances_must_be_ordered() {
        let config = EngineConfig {
            tolerance_accuracy: 0.1,
            tolerance_max_frequency: 0.05,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ToleranceOrder { .. })));
    }

    #[test]
    fn nan_tolerance_rejected() {
        let config = EngineConfig {
            tolerance_accuracy: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ToleranceOutOfRange { name: "tolerance_accuracy", .. })
        ));
    }

    #[test]
    fn toml_partial_uses_defaults() {
        let config = EngineConfig::from_toml("precision = 4\n").unwrap();
        assert_eq!(config.precision, 4);
        assert!(config.validate_inputs);
        assert!((config.tolerance_max_frequency - 0.05).abs() < 1e-12);
    }

    #[test]
    fn toml_out_of_range_rejected() {
        assert!(EngineConfig::from_toml("precision = 12\n").is_err());
        assert!(matches!(
            EngineConfig::from_toml("precision = \"three\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
