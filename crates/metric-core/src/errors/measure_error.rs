use super::ExpressionError;

/// Measure configuration errors. These are programmer/config errors and
/// are reported when a measure is constructed, never at evaluation time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasureError {
    #[error("measure {measure} has neither a field nor a primary variable")]
    MissingPrimary { measure: String },

    #[error("measure {measure} has both a field and a primary variable")]
    AmbiguousPrimary { measure: String },

    #[error("measure {measure} needs primary true values for a yes/no field")]
    MissingTrueValues { measure: String },

    #[error("measure {measure} has a base field without base values")]
    MissingBaseValues { measure: String },

    #[error("measure {measure} has both a base field and a base expression")]
    AmbiguousBase { measure: String },

    #[error("measure {measure} must set both field2 and field_operation, or neither")]
    IncompleteSecondary { measure: String },

    #[error("measure {measure} has an invalid value set: {reason}")]
    InvalidValueSet { measure: String, reason: String },

    #[error("measure {measure} has an invalid expression: {source}")]
    Expression {
        measure: String,
        #[source]
        source: ExpressionError,
    },

    #[error("measure {measure} references unknown field {field}")]
    UnknownField { measure: String, field: String },
}
