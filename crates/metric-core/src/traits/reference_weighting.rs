use std::sync::Arc;

use crate::models::{ReferenceWeightings, SubsetId};

/// Read-only source of per-cell target weights. A calculation takes one
/// snapshot up front and uses it throughout.
pub trait QuotaCellReferenceWeightingRepository: Send + Sync {
    /// `None` when the subset is unweighted.
    fn get(&self, subset: &SubsetId) -> Option<Arc<ReferenceWeightings>>;
}
