//! Top-level engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{LoaderConfig, ObservabilityConfig, SignificanceConfig, WeightingConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub loader: LoaderConfig,
    pub weighting: WeightingConfig,
    pub significance: SignificanceConfig,
    pub observability: ObservabilityConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.field_chunk_size == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "loader.field_chunk_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.loader.max_concurrent_loads == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "loader.max_concurrent_loads".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.loader.max_cartesian_product == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "loader.max_cartesian_product".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if !(self.weighting.weight_sum_tolerance > 0.0
            && self.weighting.weight_sum_tolerance.is_finite())
        {
            return Err(ConfigError::ValidationFailed {
                field: "weighting.weight_sum_tolerance".to_string(),
                message: "must be a positive finite number".to_string(),
            });
        }
        Ok(())
    }
}
