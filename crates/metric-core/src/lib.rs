//! # metric-core
//!
//! Foundation crate for the weighted metric calculation engine.
//! Defines the entity, measure, result and weighting types, the error
//! enums, configuration, constants, and the collaborator traits.
//! Every other crate in the workspace depends on this.

pub mod collections;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::EngineConfig;
pub use errors::{MetricError, MetricResult};
pub use models::{
    CalculationType, EntityInstance, EntityType, EntityValue, EntityValueCombination,
    ResponseFieldDescriptor, ResponseRecord, SubsetId, TargetInstances, WeightedDailyResult,
};
pub use traits::CancellationToken;
