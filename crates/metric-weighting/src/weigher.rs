//! Standard and ResponseLevel weighting of quota-cell totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use metric_core::constants::WEIGHT_IS_ZERO;
use metric_core::errors::WeightingError;
use metric_core::models::{CalculationType, ReferenceWeightings, WeightedDailyResult};

use crate::accumulate::CellTotalsByKey;
use crate::blend::{CellMix, CellShare};
use crate::stats::safe_divide;

/// Per-response weight of each cell feeding one result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellWeights(BTreeMap<String, f64>);

impl CellWeights {
    pub fn get(&self, cell_key: &str) -> f64 {
        self.0.get(cell_key).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Applies one snapshot of reference weightings to cell totals.
#[derive(Debug, Clone, Copy)]
pub struct QuotaWeigher<'w> {
    weightings: Option<&'w ReferenceWeightings>,
}

impl<'w> QuotaWeigher<'w> {
    /// `None` (or an empty map) weights every response at 1.
    pub fn new(weightings: Option<&'w ReferenceWeightings>) -> Result<Self, WeightingError> {
        if let Some(weightings) = weightings {
            if weightings.is_mixed() {
                return Err(WeightingError::MixedWeightingKinds {
                    subset: weightings.subset.to_string(),
                });
            }
        }
        Ok(Self {
            weightings: weightings.filter(|w| !w.is_empty()),
        })
    }

    pub fn is_weighted(&self) -> bool {
        self.weightings.is_some()
    }

    /// Per-response weights for the cells present in `cells`.
    pub fn weights_for(&self, cells: &CellTotalsByKey) -> CellWeights {
        let present = cells.iter().filter(|(_, t)| t.unweighted_count > 0);
        let Some(weightings) = self.weightings else {
            return CellWeights(present.map(|(key, _)| (key.clone(), 1.0)).collect());
        };

        if weightings.is_response_level() {
            return CellWeights(
                present
                    .map(|(key, _)| (key.clone(), weightings.get(key).map_or(0.0, |w| w.value())))
                    .collect(),
            );
        }

        let present: Vec<_> = present.collect();
        let total_count: f64 = present.iter().map(|(_, t)| f64::from(t.unweighted_count)).sum();
        let target = |key: &str| weightings.get(key).map_or(0.0, |w| w.value());
        let total_target: f64 = present.iter().map(|(key, _)| target(key.as_str())).sum();
        if total_target < WEIGHT_IS_ZERO {
            warn!(subset = %weightings.subset, cells = present.len(), "no target weight among cells present");
            return CellWeights(present.iter().map(|(key, _)| ((*key).clone(), 0.0)).collect());
        }

        CellWeights(
            present
                .iter()
                .map(|(key, totals)| {
                    let share = target(key.as_str()) / total_target;
                    let weight = share * total_count / f64::from(totals.unweighted_count);
                    ((*key).clone(), weight)
                })
                .collect(),
        )
    }

    /// Weighted result for `date` from the cell totals of one window.
    pub fn weigh(
        &self,
        date: NaiveDate,
        cells: &CellTotalsByKey,
        weights: &CellWeights,
        calculation_type: CalculationType,
    ) -> WeightedDailyResult {
        let mut result = WeightedDailyResult::empty(date);
        let mut weighted_squares = 0.0;
        for (key, totals) in cells {
            let weight = weights.get(key);
            result.unweighted_sample_size += totals.unweighted_count;
            result.unweighted_value_total += totals.value_total;
            result.weighted_sample_size += weight * f64::from(totals.unweighted_count);
            result.weighted_value_total += weight * totals.value_total;
            weighted_squares += weight * totals.value_squares;
            result.response_ids.extend_from_slice(&totals.response_ids);
        }
        result.response_ids.sort_unstable();

        let mean = safe_divide(result.weighted_value_total, result.weighted_sample_size);
        result.weighted_result = match calculation_type {
            CalculationType::NetPromoterScore => mean * 100.0,
            _ => mean,
        };

        // NPS spread is promoter share + detractor share - score², reported
        // on the same x100 scale as the score.
        let scale = match calculation_type {
            CalculationType::Average => Some(1.0),
            CalculationType::NetPromoterScore => Some(100.0),
            CalculationType::YesNo | CalculationType::Text => None,
        };
        if let Some(scale) = scale {
            if result.unweighted_sample_size > 1 && result.weighted_sample_size > 0.0 {
                let variance = (weighted_squares / result.weighted_sample_size - mean * mean).max(0.0);
                result.variance = Some(variance * scale * scale);
                result.standard_deviation = Some(variance.sqrt() * scale);
            }
        }
        result
    }

    /// Weighted sample and result of each cell in `cells`, the breakdown a
    /// relative-size blend spreads an entity's size over.
    pub fn cell_mix(
        &self,
        cells: &CellTotalsByKey,
        weights: &CellWeights,
        calculation_type: CalculationType,
    ) -> CellMix {
        let scale = match calculation_type {
            CalculationType::NetPromoterScore => 100.0,
            _ => 1.0,
        };
        CellMix::new(
            cells
                .iter()
                .filter(|(_, totals)| totals.unweighted_count > 0)
                .map(|(key, totals)| {
                    let weight = weights.get(key);
                    let share = CellShare {
                        weighted_sample: weight * f64::from(totals.unweighted_count),
                        result: totals.mean() * scale,
                    };
                    (key.clone(), share)
                })
                .collect(),
        )
    }

    /// Weights and weighs `cells` in one step.
    pub fn weigh_cells(
        &self,
        date: NaiveDate,
        cells: &CellTotalsByKey,
        calculation_type: CalculationType,
    ) -> WeightedDailyResult {
        let weights = self.weights_for(cells);
        self.weigh(date, cells, &weights, calculation_type)
    }
}
