//! # metric-measure
//!
//! Measure definitions and their per-response evaluation.
//!
//! - `expression`: the field-expression language (lexer, parser, evaluator)
//! - `measure`: validated `Measure` built from a `MeasureDefinition`
//! - `context`: binds a response and result combination to field lookups
//! - `evaluate`: base, primary and secondary resolution into a response value
//! - `nps`: Net Promoter Score classification

pub mod context;
pub mod evaluate;
pub mod expression;
pub mod measure;
pub mod nps;

pub use context::{bind_fields, FieldMap, ResponseContext};
pub use evaluate::{MeasureEvaluator, ResponseValue};
pub use expression::{EvalContext, Expression};
pub use measure::{BaseSignal, Measure, PrimarySignal, Secondary};
