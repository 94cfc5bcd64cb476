use async_trait::async_trait;
use chrono::NaiveDate;

use super::CancellationToken;
use crate::errors::DataResult;
use crate::models::{
    AnswerRow, DataTarget, DateRange, ResponseFieldDescriptor, ResponseHeader, SubsetId,
};

/// One batch of fields sharing an entity-type key, bound to the instances
/// and dates to load.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub subset: SubsetId,
    pub fields: Vec<ResponseFieldDescriptor>,
    /// Ordered entity types every field in the batch is keyed by.
    pub entity_types: Vec<String>,
    /// Instance ids to load, one target per entity type in `entity_types`.
    pub targets: Vec<DataTarget>,
    /// `None` loads every date.
    pub range: Option<DateRange>,
}

impl FetchRequest {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn target_for(&self, entity_type: &str) -> Option<&DataTarget> {
        self.targets.iter().find(|t| t.entity_type == entity_type)
    }
}

/// Store of raw survey answers. Implementations may translate requests into
/// queries against any backing store.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Load every answer to the request's fields for the requested
    /// instances and dates. Implementations should poll `token` between
    /// batches and return `DataError::Cancelled` once it fires.
    async fn load_answers(
        &self,
        request: &FetchRequest,
        token: &CancellationToken,
    ) -> DataResult<Vec<AnswerRow>>;

    /// Every response in `subset` that answered at least one of `fields`.
    async fn load_responses(
        &self,
        subset: &SubsetId,
        fields: &[ResponseFieldDescriptor],
    ) -> DataResult<Vec<ResponseHeader>>;

    /// Date of the earliest response in `subset`, if any.
    async fn dataset_start(&self, subset: &SubsetId) -> DataResult<Option<NaiveDate>>;
}
