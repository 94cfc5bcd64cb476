use serde::{Deserialize, Serialize};

/// How per-entity results blend into a market average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AverageType {
    Mean,
    ResultMean,
    EntityIdMean,
    Median,
}

/// Question shape of the measure being averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MainQuestionType {
    SingleChoice,
    MultipleChoice,
    Value,
    Text,
}

/// Per-entity value used instead of the entity id for `EntityIdMean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeanMapping {
    pub entity_id: i32,
    pub mean_calculation_value: i32,
    pub include_in_calculation: bool,
}

impl EntityMeanMapping {
    pub fn new(entity_id: i32, mean_calculation_value: i32, include_in_calculation: bool) -> Self {
        Self {
            entity_id,
            mean_calculation_value,
            include_in_calculation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeanMap {
    pub entity_type: String,
    pub mapping: Vec<EntityMeanMapping>,
}

impl EntityMeanMap {
    pub fn get(&self, entity_id: i32) -> Option<&EntityMeanMapping> {
        self.mapping.iter().find(|m| m.entity_id == entity_id)
    }

    pub fn is_excluded(&self, entity_id: i32) -> bool {
        self.get(entity_id)
            .is_some_and(|m| !m.include_in_calculation)
    }
}
