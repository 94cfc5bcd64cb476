use chrono::NaiveDate;

/// Lazy data access errors.
///
/// One fetch outcome is cloned to every caller attached to the same
/// in-flight request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("too many concurrent data loads (limit {max_concurrent})")]
    TooBusy { max_concurrent: usize },

    #[error("field {field} is keyed by entity type {entity_type} which is missing from the target instances")]
    MissingEntityType { field: String, entity_type: String },

    #[error("target cartesian product of {size} combinations exceeds the limit of {max}")]
    CartesianProductTooLarge { size: usize, max: usize },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown subset: {subset}")]
    UnknownSubset { subset: String },

    #[error("unknown field: {name}")]
    UnknownField { name: String },

    #[error("answer source failed: {reason}")]
    Source { reason: String },

    #[error("fetch {fingerprint} ended without publishing a result")]
    FetchAbandoned { fingerprint: String },
}

/// Result alias for data access operations.
pub type DataResult<T> = Result<T, DataError>;
