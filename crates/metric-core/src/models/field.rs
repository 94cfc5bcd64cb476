use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SubsetId;

/// Per-subset physical metadata for a field. Opaque to the engine apart
/// from the numeric conversion it implies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataAccessModel {
    /// Raw answers are multiplied by this before evaluation.
    pub scale_factor: Option<f64>,
    /// Decimal places kept after scaling.
    pub rounding: Option<u32>,
    /// Answers are verbatim text rather than numbers.
    pub value_is_text: bool,
}

impl DataAccessModel {
    pub fn numeric(&self, raw: i32) -> f64 {
        let value = f64::from(raw) * self.scale_factor.unwrap_or(1.0);
        match self.rounding {
            Some(places) => {
                let factor = 10f64.powi(places as i32);
                (value * factor).round() / factor
            }
            None => value,
        }
    }
}

/// A survey field keyed by zero or more entity types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFieldDescriptor {
    pub name: String,
    /// Ordered entity types the field is keyed by. Empty for profile fields.
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub data_access: BTreeMap<SubsetId, DataAccessModel>,
}

impl ResponseFieldDescriptor {
    pub fn new(name: impl Into<String>, entity_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entity_types,
            data_access: BTreeMap::new(),
        }
    }

    pub fn profile(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_data_access(mut self, subset: SubsetId, model: DataAccessModel) -> Self {
        self.data_access.insert(subset, model);
        self
    }

    /// A profile field is keyed by no entity type.
    pub fn is_profile(&self) -> bool {
        self.entity_types.is_empty()
    }

    /// Grouping key: fields with the same key can be fetched together.
    pub fn entity_key(&self) -> String {
        self.entity_types.join("|")
    }

    pub fn data_access_for(&self, subset: &SubsetId) -> Option<&DataAccessModel> {
        self.data_access.get(subset)
    }

    /// Numeric value of a raw answer within `subset`.
    pub fn numeric_value(&self, subset: &SubsetId, raw: i32) -> f64 {
        match self.data_access_for(subset) {
            Some(model) => model.numeric(raw),
            None => f64::from(raw),
        }
    }

    pub fn is_text(&self, subset: &SubsetId) -> bool {
        self.data_access_for(subset)
            .is_some_and(|model| model.value_is_text)
    }
}
