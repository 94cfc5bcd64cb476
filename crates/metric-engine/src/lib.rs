//! # metric-engine
//!
//! Entry point of the weighted metric calculation engine.
//!
//! `MetricCalculationOrchestrator` resolves a `CalculationRequest` into
//! entity combinations, loads the answers it needs through the lazy data
//! layer, evaluates every response, weights quota cells per result window,
//! and hands the series on to market averaging and significance testing.

pub mod observability;
pub mod orchestrator;
pub mod request;

pub use observability::init_tracing;
pub use orchestrator::MetricCalculationOrchestrator;
pub use request::CalculationRequest;
