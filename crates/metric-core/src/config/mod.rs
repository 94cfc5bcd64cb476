//! Configuration system for the metric engine.
//! TOML-based, every section optional with compiled defaults.

pub mod defaults;
pub mod engine_config;
pub mod loader_config;
pub mod observability_config;
pub mod significance_config;
pub mod weighting_config;

pub use engine_config::EngineConfig;
pub use loader_config::LoaderConfig;
pub use observability_config::ObservabilityConfig;
pub use significance_config::SignificanceConfig;
pub use weighting_config::WeightingConfig;
