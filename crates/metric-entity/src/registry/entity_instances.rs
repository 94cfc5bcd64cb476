use metric_core::collections::FxHashMap;
use metric_core::errors::EntityError;
use metric_core::models::{EntityInstance, SubsetId};

/// Instances of every entity type, kept sorted by id.
#[derive(Debug, Clone, Default)]
pub struct EntityInstanceRepository {
    instances: FxHashMap<String, Vec<EntityInstance>>,
}

impl EntityInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an instance.
    pub fn add(&mut self, entity_type: &str, instance: EntityInstance) {
        let list = self.instances.entry(entity_type.to_string()).or_default();
        match list.binary_search_by_key(&instance.id, |i| i.id) {
            Ok(position) => list[position] = instance,
            Err(position) => list.insert(position, instance),
        }
    }

    pub fn get(&self, entity_type: &str, id: i32) -> Result<&EntityInstance, EntityError> {
        self.instances
            .get(entity_type)
            .and_then(|list| {
                list.binary_search_by_key(&id, |i| i.id)
                    .ok()
                    .map(|position| &list[position])
            })
            .ok_or_else(|| EntityError::UnknownEntityInstance {
                entity_type: entity_type.to_string(),
                id,
            })
    }

    pub fn contains(&self, entity_type: &str, id: i32) -> bool {
        self.get(entity_type, id).is_ok()
    }

    /// Instances of `entity_type` visible in `subset`, ascending by id.
    pub fn instances_of<'a>(
        &'a self,
        entity_type: &str,
        subset: &'a SubsetId,
    ) -> impl Iterator<Item = &'a EntityInstance> + 'a {
        self.instances
            .get(entity_type)
            .into_iter()
            .flatten()
            .filter(move |i| i.is_in_subset(subset))
    }

    /// Up to `limit` ids of `entity_type` in `subset` greater than `after`,
    /// ascending.
    pub fn ids_after(&self, entity_type: &str, subset: &SubsetId, after: i32, limit: usize) -> Vec<i32> {
        self.instances_of(entity_type, subset)
            .map(|i| i.id)
            .filter(|id| *id > after)
            .take(limit)
            .collect()
    }
}
