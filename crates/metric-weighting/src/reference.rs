//! Standard reference weightings from target population shares.

use std::collections::BTreeMap;

use tracing::warn;

use metric_core::constants::WEIGHT_IS_ZERO;
use metric_core::errors::WeightingError;
use metric_core::models::{ReferenceWeightings, SubsetId, WeightingValue};

pub struct ReferenceWeightingCalculator;

impl ReferenceWeightingCalculator {
    /// Build Standard weights for `subset` from each cell's target share of
    /// the population. Cells with no sample cannot be weighted and get zero;
    /// the remaining targets are renormalised to sum to one.
    pub fn from_targets(
        subset: SubsetId,
        targets: &BTreeMap<String, f64>,
        sample_sizes: &BTreeMap<String, u32>,
    ) -> Result<ReferenceWeightings, WeightingError> {
        if let Some((cell, target)) = targets
            .iter()
            .find(|(_, target)| !(target.is_finite() && **target >= 0.0))
        {
            return Err(WeightingError::InvalidTarget {
                cell: cell.clone(),
                reason: format!("target {target} must be a non-negative finite share"),
            });
        }

        let sampled = |cell: &str| sample_sizes.get(cell).copied().unwrap_or(0) > 0;
        for cell in targets.keys().filter(|cell| !sampled(cell)) {
            warn!(subset = %subset, cell = %cell, "quota cell has no sample, weighting it at zero");
        }

        let total: f64 = targets
            .iter()
            .filter(|(cell, _)| sampled(cell))
            .map(|(_, target)| *target)
            .sum();
        if total < WEIGHT_IS_ZERO {
            return Err(WeightingError::InvalidTarget {
                cell: "*".to_string(),
                reason: "no sampled cell has a positive target".to_string(),
            });
        }

        let cells = targets
            .iter()
            .map(|(cell, target)| {
                let share = if sampled(cell) { target / total } else { 0.0 };
                (cell.clone(), WeightingValue::Standard(share))
            })
            .collect();
        Ok(ReferenceWeightings::new(subset, cells))
    }
}
