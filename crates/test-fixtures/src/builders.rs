//! Terse constructors for test data.

use chrono::NaiveDate;

use metric_core::models::{
    AnswerRow, AnswerValue, EntityIds, EntityInstance, EntityType, EntityWeightedDailyResults,
    ResponseFieldDescriptor, ResponseId, ResponseRecord, TargetInstances, WeightedDailyResult,
};

/// # Panics
/// Panics on an invalid calendar date.
pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid date {year}-{month}-{day}"))
}

pub fn brand() -> EntityType {
    EntityType::new("brand", "Brand", "Brands")
}

pub fn product() -> EntityType {
    EntityType::new("product", "Product", "Products")
}

pub fn instance(id: i32) -> EntityInstance {
    EntityInstance::new(id, format!("Instance {id}"))
}

pub fn targets(entity_type: EntityType, ids: impl IntoIterator<Item = i32>) -> TargetInstances {
    TargetInstances::new(entity_type, ids.into_iter().map(instance).collect())
}

pub fn brand_field(name: &str) -> ResponseFieldDescriptor {
    ResponseFieldDescriptor::new(name, vec!["brand".to_string()])
}

pub fn profile_field(name: &str) -> ResponseFieldDescriptor {
    ResponseFieldDescriptor::profile(name)
}

pub fn answer(
    response_id: ResponseId,
    date: NaiveDate,
    field: &str,
    entity_ids: &[i32],
    value: i32,
) -> AnswerRow {
    AnswerRow {
        response_id,
        date,
        field: field.to_string(),
        entity_ids: EntityIds::from_slice(entity_ids),
        value: AnswerValue::Number(value),
    }
}

pub fn text_answer(response_id: ResponseId, date: NaiveDate, field: &str, text: &str) -> AnswerRow {
    AnswerRow {
        response_id,
        date,
        field: field.to_string(),
        entity_ids: EntityIds::new(),
        value: AnswerValue::Text(text.to_string()),
    }
}

/// A response with the given numeric profile answers.
pub fn profile_response(id: ResponseId, date: NaiveDate, answers: &[(&str, i32)]) -> ResponseRecord {
    answers
        .iter()
        .fold(ResponseRecord::new(id, date), |record, (field, value)| {
            record.with_answer(field, &[], AnswerValue::Number(*value))
        })
}

/// Fluent `WeightedDailyResult` builder. Weighted values default to the
/// unweighted ones.
#[derive(Debug, Clone)]
pub struct DailyResultBuilder {
    result: WeightedDailyResult,
    weighted_sample: Option<f64>,
    weighted_value_total: Option<f64>,
}

pub fn daily_result(date: NaiveDate) -> DailyResultBuilder {
    DailyResultBuilder {
        result: WeightedDailyResult::empty(date),
        weighted_sample: None,
        weighted_value_total: None,
    }
}

impl DailyResultBuilder {
    pub fn sample(mut self, unweighted: u32) -> Self {
        self.result.unweighted_sample_size = unweighted;
        self
    }

    pub fn value_total(mut self, unweighted: f64) -> Self {
        self.result.unweighted_value_total = unweighted;
        self
    }

    pub fn weighted(mut self, sample: f64, value_total: f64) -> Self {
        self.weighted_sample = Some(sample);
        self.weighted_value_total = Some(value_total);
        self
    }

    pub fn result(mut self, weighted_result: f64) -> Self {
        self.result.weighted_result = weighted_result;
        self
    }

    pub fn response_ids(mut self, ids: Vec<ResponseId>) -> Self {
        self.result.response_ids = ids;
        self
    }

    pub fn build(mut self) -> WeightedDailyResult {
        self.result.weighted_sample_size = self
            .weighted_sample
            .unwrap_or(f64::from(self.result.unweighted_sample_size));
        self.result.weighted_value_total = self
            .weighted_value_total
            .unwrap_or(self.result.unweighted_value_total);
        self.result
    }
}

pub fn entity_results(id: i32, results: Vec<WeightedDailyResult>) -> EntityWeightedDailyResults {
    EntityWeightedDailyResults::new(Some(instance(id)), results)
}
