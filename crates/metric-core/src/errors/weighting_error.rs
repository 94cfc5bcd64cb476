use chrono::NaiveDate;

/// Quota-cell weighting and market-average errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightingError {
    #[error("subset {subset} mixes standard and response-level weighting in one calculation")]
    MixedWeightingKinds { subset: String },

    #[error("entity instances are not aligned with relative-size results: {details}")]
    MisalignedEntities { details: String },

    #[error("entities have differing period counts (min {min}, max {max})")]
    PeriodCountMismatch { min: usize, max: usize },

    #[error("no relative-size weighting defined for {date}")]
    MissingRelativeSize { date: NaiveDate },

    #[error("blend weights sum to {sum}, outside tolerance {tolerance} of 1")]
    WeightSumViolation { sum: f64, tolerance: f64 },

    #[error("no entity results to average")]
    EmptyResults,

    #[error("unable to locate the median respondent")]
    MedianUnavailable,

    #[error("invalid weighting target for cell {cell}: {reason}")]
    InvalidTarget { cell: String, reason: String },
}
