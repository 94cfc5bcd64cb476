use std::sync::{Arc, RwLock};

use tracing::info;

use super::{EntityInstanceRepository, EntityTypeRepository, ResponseFieldManager};
use crate::entity_set::EntitySetGraph;

/// One immutable view of every registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub entity_types: EntityTypeRepository,
    pub instances: EntityInstanceRepository,
    pub fields: ResponseFieldManager,
    pub entity_sets: EntitySetGraph,
}

impl RegistrySnapshot {
    pub fn new(
        entity_types: EntityTypeRepository,
        instances: EntityInstanceRepository,
        fields: ResponseFieldManager,
    ) -> Self {
        Self {
            entity_types,
            instances,
            fields,
            entity_sets: EntitySetGraph::default(),
        }
    }

    pub fn with_entity_sets(mut self, entity_sets: EntitySetGraph) -> Self {
        self.entity_sets = entity_sets;
        self
    }
}

/// Process-wide handle to the current registry snapshot.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl SharedRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot to use for a whole calculation.
    pub fn current(&self) -> Arc<RegistrySnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new snapshot. Holders of the previous one are unaffected.
    pub fn refresh(&self, snapshot: RegistrySnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
        info!(
            entity_types = guard.entity_types.len(),
            fields = guard.fields.len(),
            "registry snapshot refreshed"
        );
    }
}
