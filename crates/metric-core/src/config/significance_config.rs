use serde::{Deserialize, Serialize};

use crate::models::SigConfidenceLevel;

/// Significance testing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    pub default_confidence: SigConfidenceLevel,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            default_confidence: SigConfidenceLevel::NinetyFive,
        }
    }
}
