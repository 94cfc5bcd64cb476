use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::SubsetId;
use crate::constants::UNWEIGHTED_CELL_KEY;

/// A demographic bucket within a subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuotaCell {
    pub subset: SubsetId,
    /// Interlocked dimension key, e.g. `"age:2|region:1"`.
    pub key: String,
}

impl QuotaCell {
    pub fn new(subset: SubsetId, key: impl Into<String>) -> Self {
        Self {
            subset,
            key: key.into(),
        }
    }

    /// The cell holding responses with no demographic allocation.
    pub fn unweighted(subset: SubsetId) -> Self {
        Self::new(subset, UNWEIGHTED_CELL_KEY)
    }

    pub fn is_unweighted(&self) -> bool {
        self.key == UNWEIGHTED_CELL_KEY
    }
}

impl fmt::Display for QuotaCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Contribution weight of a quota cell.
///
/// `Standard` is the cell's target share of the population and is
/// renormalised against the cells present in a result. `ResponseLevel` is
/// an absolute multiplier applied to every response in the cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingValue {
    Standard(f64),
    ResponseLevel(f64),
}

impl WeightingValue {
    pub fn value(&self) -> f64 {
        match self {
            Self::Standard(v) | Self::ResponseLevel(v) => *v,
        }
    }

    pub fn is_response_level(&self) -> bool {
        matches!(self, Self::ResponseLevel(_))
    }
}

/// Immutable per-subset map from quota cell key to weighting value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceWeightings {
    pub subset: SubsetId,
    cells: BTreeMap<String, WeightingValue>,
}

impl ReferenceWeightings {
    pub fn new(subset: SubsetId, cells: BTreeMap<String, WeightingValue>) -> Self {
        Self { subset, cells }
    }

    pub fn get(&self, cell_key: &str) -> Option<WeightingValue> {
        self.cells.get(cell_key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, WeightingValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell uses response-level weights.
    pub fn is_response_level(&self) -> bool {
        !self.cells.is_empty() && self.cells.values().all(WeightingValue::is_response_level)
    }

    /// True when standard and response-level cells are both present.
    pub fn is_mixed(&self) -> bool {
        let response_level = self.cells.values().filter(|v| v.is_response_level()).count();
        response_level > 0 && response_level < self.cells.len()
    }
}
