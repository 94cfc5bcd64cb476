use serde::{Deserialize, Serialize};

use super::defaults;

/// Quota-cell weighting and market-average configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Market-average weights are capped so each 1/n-th of the result
    /// represents at least one respondent.
    pub minimum_sample_per_point: u16,
    /// Allowed deviation of blend weights from summing to one.
    pub weight_sum_tolerance: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            minimum_sample_per_point: defaults::DEFAULT_MINIMUM_SAMPLE_PER_POINT,
            weight_sum_tolerance: defaults::DEFAULT_WEIGHT_SUM_TOLERANCE,
        }
    }
}
