//! # metric-filter
//!
//! Response filters. A filter is first bound to the result combination
//! being calculated and then applied to each response. Every filter also
//! reports the fields and entity instances it needs loaded.

pub mod and_filter;
pub mod expression_filter;
pub mod filter;
pub mod metric_filter;
pub mod targets;

pub use and_filter::AndFilter;
pub use expression_filter::ExpressionFilter;
pub use filter::{AlwaysIncludeFilter, BoundFilter, Filter, FilterDependencies};
pub use metric_filter::MetricFilter;
pub use targets::merge_data_targets;
