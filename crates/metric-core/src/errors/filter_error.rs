use super::{ExpressionError, MeasureError};

/// Filter construction errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter expression: {0}")]
    Expression(#[from] ExpressionError),

    #[error("filter measure is invalid: {0}")]
    Measure(#[from] MeasureError),

    #[error("filter references unknown field {field}")]
    UnknownField { field: String },

    #[error("filter on field {field} pins entity type {entity_type} which the field is not keyed by")]
    UnrelatedEntityType { field: String, entity_type: String },
}
