//! # metric-significance
//!
//! Up/Down/None verdicts for a change between two weighted results.
//!
//! The t-score's variance model follows the calculation type: pooled
//! proportions for YesNo, the reported standard deviations for Average,
//! and promoter-share proportions for Net Promoter Score. Text results are
//! never tested.

pub mod critical;
pub mod t_score;

pub use critical::critical_value;
pub use t_score::t_score;

use metric_core::models::{CalculationType, SigConfidenceLevel, Significance, WeightedDailyResult};
use tracing::debug;

/// Verdict for `t` at a two-tailed `level`.
pub fn significance_for_t_score(t: f64, level: SigConfidenceLevel) -> Significance {
    let critical = critical_value(level);
    if t > critical {
        Significance::Up
    } else if t < -critical {
        Significance::Down
    } else {
        Significance::None
    }
}

/// Whether `current` changed significantly from `previous`.
pub fn calculate_significance(
    calculation_type: CalculationType,
    current: &WeightedDailyResult,
    previous: &WeightedDailyResult,
    level: SigConfidenceLevel,
) -> Significance {
    match t_score(calculation_type, current, previous) {
        Some(t) => significance_for_t_score(t, level),
        None => Significance::None,
    }
}

/// Verdict of each result against the one before it. The first result has
/// nothing to compare against and is always `None`.
pub fn compare_consecutive(
    results: &[WeightedDailyResult],
    calculation_type: CalculationType,
    level: SigConfidenceLevel,
) -> Vec<Significance> {
    let verdicts: Vec<Significance> = std::iter::once(Significance::None)
        .chain(results.windows(2).map(|pair| {
            calculate_significance(calculation_type, &pair[1], &pair[0], level)
        }))
        .take(results.len())
        .collect();
    debug!(
        periods = results.len(),
        significant = verdicts.iter().filter(|v| **v != Significance::None).count(),
        ?level,
        "compared consecutive periods"
    );
    verdicts
}
