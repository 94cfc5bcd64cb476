use std::sync::Arc;

use metric_core::collections::{FxHashMap, FxHashSet};
use metric_core::errors::EntityError;
use metric_core::models::ResponseFieldDescriptor;

/// Field descriptors by name.
#[derive(Debug, Clone, Default)]
pub struct ResponseFieldManager {
    fields: FxHashMap<String, Arc<ResponseFieldDescriptor>>,
}

impl ResponseFieldManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Rejects duplicate names and a field keyed twice by
    /// the same entity type.
    pub fn add(&mut self, field: ResponseFieldDescriptor) -> Result<Arc<ResponseFieldDescriptor>, EntityError> {
        if self.fields.contains_key(&field.name) {
            return Err(EntityError::DuplicateField { name: field.name });
        }
        let mut seen = FxHashSet::default();
        for entity_type in &field.entity_types {
            if !seen.insert(entity_type.as_str()) {
                return Err(EntityError::FieldKeyedTwice {
                    field: field.name.clone(),
                    entity_type: entity_type.clone(),
                });
            }
        }
        let field = Arc::new(field);
        self.fields.insert(field.name.clone(), Arc::clone(&field));
        Ok(field)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ResponseFieldDescriptor>, EntityError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| EntityError::UnknownField {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResponseFieldDescriptor>> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
