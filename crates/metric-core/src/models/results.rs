use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{EntityInstance, ResponseId};

/// Weighted aggregate for one result date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedDailyResult {
    pub date: NaiveDate,
    pub weighted_result: f64,
    pub weighted_sample_size: f64,
    pub unweighted_sample_size: u32,
    pub weighted_value_total: f64,
    pub unweighted_value_total: f64,
    pub standard_deviation: Option<f64>,
    pub variance: Option<f64>,
    /// Contributing response ids, kept only when the average asks for them.
    #[serde(default)]
    pub response_ids: Vec<ResponseId>,
}

impl WeightedDailyResult {
    /// An empty result for `date`.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            weighted_result: 0.0,
            weighted_sample_size: 0.0,
            unweighted_sample_size: 0,
            weighted_value_total: 0.0,
            unweighted_value_total: 0.0,
            standard_deviation: None,
            variance: None,
            response_ids: Vec::new(),
        }
    }
}

/// Results over time for one target instance. `entity_instance` is `None`
/// for a calculation with no split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWeightedDailyResults {
    pub entity_instance: Option<EntityInstance>,
    pub results: Vec<WeightedDailyResult>,
}

impl EntityWeightedDailyResults {
    pub fn new(entity_instance: Option<EntityInstance>, results: Vec<WeightedDailyResult>) -> Self {
        Self {
            entity_instance,
            results,
        }
    }

    pub fn instance_id(&self) -> Option<i32> {
        self.entity_instance.as_ref().map(|i| i.id)
    }
}
