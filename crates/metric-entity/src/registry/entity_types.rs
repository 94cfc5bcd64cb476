use metric_core::collections::FxHashMap;
use metric_core::errors::EntityError;
use metric_core::models::EntityType;

/// Entity types by id. Always contains the profile type.
#[derive(Debug, Clone)]
pub struct EntityTypeRepository {
    types: FxHashMap<String, EntityType>,
}

impl Default for EntityTypeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTypeRepository {
    pub fn new() -> Self {
        let mut types = FxHashMap::default();
        let profile = EntityType::profile();
        types.insert(profile.id.clone(), profile);
        Self { types }
    }

    pub fn add(&mut self, entity_type: EntityType) -> Result<(), EntityError> {
        if self.types.contains_key(&entity_type.id) {
            return Err(EntityError::DuplicateEntityType {
                entity_type: entity_type.id,
            });
        }
        self.types.insert(entity_type.id.clone(), entity_type);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&EntityType, EntityError> {
        self.types
            .get(id)
            .ok_or_else(|| EntityError::UnknownEntityType {
                entity_type: id.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn profile(&self) -> &EntityType {
        // `new` always inserts the profile type and nothing removes it.
        &self.types[metric_core::constants::PROFILE_ENTITY_TYPE]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
