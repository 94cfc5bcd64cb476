use super::{
    ConfigError, DataError, EntityError, ExpressionError, FilterError, MeasureError,
    WeightingError, WindowingError,
};

/// Top-level engine error. Aggregates subsystem errors via `From` conversions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("entity error: {0}")]
    Entity(#[from] EntityError),

    #[error("expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("measure error: {0}")]
    Measure(#[from] MeasureError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("weighting error: {0}")]
    Weighting(#[from] WeightingError),

    #[error("windowing error: {0}")]
    Windowing(#[from] WindowingError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MetricError {
    /// True when the error is the operation-cancelled outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Data(DataError::Cancelled))
    }
}

/// Convenience alias used throughout the workspace.
pub type MetricResult<T> = Result<T, MetricError>;
