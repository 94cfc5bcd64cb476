//! Field lookups for one response and one result combination.

use std::sync::Arc;

use metric_core::collections::FxHashMap;
use metric_core::errors::EntityError;
use metric_core::models::{
    AnswerValue, EntityValueCombination, ResponseFieldDescriptor, ResponseRecord, SubsetId,
};
use metric_entity::ResponseFieldManager;

use crate::expression::EvalContext;

/// Descriptors of the fields an evaluation reads, by name.
pub type FieldMap = FxHashMap<String, Arc<ResponseFieldDescriptor>>;

/// Resolve `names` against the field registry.
pub fn bind_fields<'a>(
    names: impl IntoIterator<Item = &'a str>,
    registry: &ResponseFieldManager,
) -> Result<FieldMap, EntityError> {
    names
        .into_iter()
        .map(|name| registry.get(name).map(|field| (name.to_string(), field)))
        .collect()
}

/// One response seen from one result row.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub response: &'a ResponseRecord,
    pub combination: &'a EntityValueCombination,
    pub fields: &'a FieldMap,
    pub subset: &'a SubsetId,
}

impl<'a> ResponseContext<'a> {
    pub fn new(
        response: &'a ResponseRecord,
        combination: &'a EntityValueCombination,
        fields: &'a FieldMap,
        subset: &'a SubsetId,
    ) -> Self {
        Self {
            response,
            combination,
            fields,
            subset,
        }
    }

    fn answer(&self, field: &str) -> Option<(&'a ResponseFieldDescriptor, &'a AnswerValue)> {
        let descriptor = self.fields.get(field)?;
        let answer = self.response.answer_for(descriptor, self.combination)?;
        Some((descriptor.as_ref(), answer))
    }

    /// Verbatim answer to a text field, if any.
    pub fn text(&self, field: &str) -> Option<&'a str> {
        self.answer(field).and_then(|(_, answer)| answer.as_text())
    }
}

impl EvalContext for ResponseContext<'_> {
    fn field_value(&self, field: &str) -> Option<f64> {
        let (descriptor, answer) = self.answer(field)?;
        let raw = answer.as_number()?;
        Some(descriptor.numeric_value(self.subset, raw))
    }

    fn field_values(&self, field: &str, pins: &[(&str, Vec<i32>)]) -> Vec<f64> {
        let Some(descriptor) = self.fields.get(field) else {
            return Vec::new();
        };
        let positions: Option<Vec<(usize, &Vec<i32>)>> = pins
            .iter()
            .map(|(entity_type, ids)| {
                descriptor
                    .entity_types
                    .iter()
                    .position(|t| t.as_str() == *entity_type)
                    .map(|position| (position, ids))
            })
            .collect();
        let Some(positions) = positions else {
            return Vec::new();
        };

        self.response
            .answers_to(field)
            .filter(|(ids, _)| {
                positions
                    .iter()
                    .all(|(position, allowed)| ids.get(*position).is_some_and(|id| allowed.contains(id)))
            })
            .filter_map(|(_, answer)| answer.as_number())
            .map(|raw| descriptor.numeric_value(self.subset, raw))
            .collect()
    }

    fn result_entity(&self, entity_type: &str) -> Option<i32> {
        self.combination.instance_of(entity_type)
    }
}
