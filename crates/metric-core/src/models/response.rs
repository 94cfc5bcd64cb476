use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{EntityValueCombination, ResponseFieldDescriptor};

/// Identifier of one survey response.
pub type ResponseId = i64;

/// Instance ids of an answer, ordered like the field's entity types.
pub type EntityIds = SmallVec<[i32; 2]>;

/// A raw stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    Number(i32),
    Text(String),
}

impl AnswerValue {
    pub fn as_number(&self) -> Option<i32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Number(_) => None,
        }
    }
}

/// One answer row as produced by an answer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRow {
    pub response_id: ResponseId,
    pub date: NaiveDate,
    pub field: String,
    pub entity_ids: EntityIds,
    pub value: AnswerValue,
}

/// Id and survey date of a response, without answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub id: ResponseId,
    pub date: NaiveDate,
}

/// A response with every answer loaded for it so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub date: NaiveDate,
    answers: HashMap<String, HashMap<EntityIds, AnswerValue>>,
}

impl ResponseRecord {
    pub fn new(id: ResponseId, date: NaiveDate) -> Self {
        Self {
            id,
            date,
            answers: HashMap::new(),
        }
    }

    pub fn header(&self) -> ResponseHeader {
        ResponseHeader {
            id: self.id,
            date: self.date,
        }
    }

    /// Builder-style answer insertion.
    pub fn with_answer(mut self, field: &str, entity_ids: &[i32], value: AnswerValue) -> Self {
        self.set_answer(field, entity_ids, value);
        self
    }

    pub fn set_answer(&mut self, field: &str, entity_ids: &[i32], value: AnswerValue) {
        self.answers
            .entry(field.to_string())
            .or_default()
            .insert(EntityIds::from_slice(entity_ids), value);
    }

    pub fn answer(&self, field: &str, entity_ids: &[i32]) -> Option<&AnswerValue> {
        self.answers.get(field)?.get(entity_ids)
    }

    /// Answer to `field` for the part of `combination` the field is keyed by.
    pub fn answer_for(
        &self,
        field: &ResponseFieldDescriptor,
        combination: &EntityValueCombination,
    ) -> Option<&AnswerValue> {
        let ids = combination.ids_for(&field.entity_types)?;
        self.answer(&field.name, &ids)
    }

    /// Every stored answer to `field`, with the entity ids it is keyed by.
    pub fn answers_to<'a>(
        &'a self,
        field: &str,
    ) -> impl Iterator<Item = (&'a EntityIds, &'a AnswerValue)> + 'a {
        self.answers.get(field).into_iter().flatten()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.answers.contains_key(field)
    }

    /// Copy every answer of `other` into this record.
    pub fn merge_from(&mut self, other: &ResponseRecord) {
        for (field, by_ids) in &other.answers {
            let target = self.answers.entry(field.clone()).or_default();
            for (ids, value) in by_ids {
                target.insert(ids.clone(), value.clone());
            }
        }
    }

    /// Number of stored answers across all fields.
    pub fn answer_count(&self) -> usize {
        self.answers.values().map(HashMap::len).sum()
    }
}
