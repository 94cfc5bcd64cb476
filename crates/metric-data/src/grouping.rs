use std::collections::BTreeMap;

use metric_core::collections::FxHashSet;
use metric_core::models::ResponseFieldDescriptor;

/// Fields keyed by the same ordered entity types, fetched in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub entity_types: Vec<String>,
    pub fields: Vec<ResponseFieldDescriptor>,
}

impl FieldGroup {
    pub fn entity_key(&self) -> String {
        self.entity_types.join("|")
    }

    pub fn is_profile(&self) -> bool {
        self.entity_types.is_empty()
    }
}

/// Group `fields` by entity-type key, then split each group into chunks of
/// at most `chunk_size`. Duplicate names collapse to the first occurrence.
/// Groups come out ordered by key; fields keep their input order.
pub fn group_fields(fields: &[ResponseFieldDescriptor], chunk_size: usize) -> Vec<FieldGroup> {
    let chunk_size = chunk_size.max(1);
    let mut seen = FxHashSet::default();
    let mut by_key: BTreeMap<String, (Vec<String>, Vec<ResponseFieldDescriptor>)> = BTreeMap::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            continue;
        }
        by_key
            .entry(field.entity_key())
            .or_insert_with(|| (field.entity_types.clone(), Vec::new()))
            .1
            .push(field.clone());
    }

    by_key
        .into_values()
        .flat_map(|(entity_types, fields)| {
            fields
                .chunks(chunk_size)
                .map(|chunk| FieldGroup {
                    entity_types: entity_types.clone(),
                    fields: chunk.to_vec(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
