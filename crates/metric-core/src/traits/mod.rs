//! Collaborator contracts the engine consumes.

pub mod answer_source;
pub mod cancellation;
pub mod data_limiter;
pub mod reference_weighting;

pub use answer_source::{AnswerSource, FetchRequest};
pub use cancellation::{Cancellable, CancellationToken};
pub use data_limiter::DataLimiter;
pub use reference_weighting::QuotaCellReferenceWeightingRepository;
