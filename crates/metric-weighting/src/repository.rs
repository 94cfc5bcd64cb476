//! In-memory reference weighting store, concurrent via `DashMap`.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use metric_core::models::{ReferenceWeightings, SubsetId};
use metric_core::traits::QuotaCellReferenceWeightingRepository;

/// Readers get an `Arc` snapshot; replacing a subset's weightings never
/// mutates a snapshot already handed out.
#[derive(Debug, Default)]
pub struct InMemoryReferenceWeightingRepository {
    by_subset: DashMap<SubsetId, Arc<ReferenceWeightings>>,
}

impl InMemoryReferenceWeightingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, weightings: ReferenceWeightings) -> Self {
        self.insert(weightings);
        self
    }

    /// Store or replace the weightings of `weightings.subset`.
    pub fn insert(&self, weightings: ReferenceWeightings) {
        info!(subset = %weightings.subset, cells = weightings.len(), "reference weightings loaded");
        self.by_subset
            .insert(weightings.subset.clone(), Arc::new(weightings));
    }

    pub fn remove(&self, subset: &SubsetId) -> Option<Arc<ReferenceWeightings>> {
        self.by_subset.remove(subset).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.by_subset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subset.is_empty()
    }
}

impl QuotaCellReferenceWeightingRepository for InMemoryReferenceWeightingRepository {
    fn get(&self, subset: &SubsetId) -> Option<Arc<ReferenceWeightings>> {
        self.by_subset.get(subset).map(|r| Arc::clone(r.value()))
    }
}
