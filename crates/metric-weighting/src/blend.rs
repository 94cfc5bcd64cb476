//! Explicit entity x cell weight grid for a relative-size market average.
//!
//! Each entity's cells are normalised to equal population representation,
//! then entities are scaled by their relative size. The resulting grid sums
//! to one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use metric_core::constants::WEIGHT_IS_ZERO;
use metric_core::errors::WeightingError;

/// Target shares of the quota cells present for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCellTargets {
    pub entity_id: i32,
    pub cells: BTreeMap<String, f64>,
}

impl EntityCellTargets {
    pub fn new(entity_id: i32, cells: BTreeMap<String, f64>) -> Self {
        Self { entity_id, cells }
    }
}

/// Weighted sample and result of one quota cell behind an entity's result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellShare {
    pub weighted_sample: f64,
    /// Cell mean on the result's scale.
    pub result: f64,
}

/// Per-cell breakdown of one weighted result. The entity's result is the
/// weighted-sample-share mean of the cell results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellMix(BTreeMap<String, CellShare>);

impl CellMix {
    pub fn new(cells: BTreeMap<String, CellShare>) -> Self {
        Self(cells)
    }

    pub fn get(&self, cell_key: &str) -> Option<&CellShare> {
        self.0.get(cell_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellShare)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn weighted_sample(&self) -> f64 {
        self.0.values().map(|c| c.weighted_sample).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Weight per (entity id, cell key).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlendWeights {
    weights: BTreeMap<(i32, String), f64>,
}

impl BlendWeights {
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn get(&self, entity_id: i32, cell_key: &str) -> f64 {
        self.weights
            .get(&(entity_id, cell_key.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &str, f64)> {
        self.weights
            .iter()
            .map(|((entity, cell), w)| (*entity, cell.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weighted sum of per-entity, per-cell values. Missing values count as zero.
    pub fn blend(&self, values: &BTreeMap<(i32, String), f64>) -> f64 {
        self.weights
            .iter()
            .map(|(key, w)| w * values.get(key).copied().unwrap_or(0.0))
            .sum()
    }
}

/// `w[e, c] = s[e] / sum(s) * t[e, c] / sum_c(t[e, c])`.
///
/// Fails with `WeightSumViolation` when the grid does not sum to one within
/// `tolerance`, e.g. when an entity has no cell mass to spread its size over.
pub fn blend_weights(
    entities: &[EntityCellTargets],
    relative_sizes: &BTreeMap<i32, f64>,
    tolerance: f64,
) -> Result<BlendWeights, WeightingError> {
    if let Some((entity, size)) = relative_sizes
        .iter()
        .find(|(_, size)| !(size.is_finite() && **size >= 0.0))
    {
        return Err(WeightingError::InvalidTarget {
            cell: format!("entity {entity}"),
            reason: format!("relative size {size} must be a non-negative finite value"),
        });
    }

    let size_of = |entity_id: i32| relative_sizes.get(&entity_id).copied().unwrap_or(0.0);
    let total_size: f64 = entities.iter().map(|e| size_of(e.entity_id)).sum();

    let mut weights = BTreeMap::new();
    if total_size >= WEIGHT_IS_ZERO {
        for entity in entities {
            let cell_mass: f64 = entity.cells.values().filter(|t| **t > 0.0).sum();
            if cell_mass < WEIGHT_IS_ZERO {
                debug!(entity = entity.entity_id, "entity has no cell mass to blend");
                continue;
            }
            let entity_share = size_of(entity.entity_id) / total_size;
            for (cell, target) in entity.cells.iter().filter(|(_, t)| **t > 0.0) {
                weights.insert((entity.entity_id, cell.clone()), entity_share * target / cell_mass);
            }
        }
    }

    let blend = BlendWeights { weights };
    let sum = blend.sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(WeightingError::WeightSumViolation { sum, tolerance });
    }
    Ok(blend)
}
