//! Error handling for the metric engine.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod data_error;
pub mod entity_error;
pub mod expression_error;
pub mod filter_error;
pub mod measure_error;
pub mod metric_error;
pub mod weighting_error;
pub mod windowing_error;

pub use config_error::ConfigError;
pub use data_error::{DataError, DataResult};
pub use entity_error::EntityError;
pub use expression_error::ExpressionError;
pub use filter_error::FilterError;
pub use measure_error::MeasureError;
pub use metric_error::{MetricError, MetricResult};
pub use weighting_error::WeightingError;
pub use windowing_error::WindowingError;
