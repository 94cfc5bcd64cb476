use std::sync::OnceLock;

use statrs::distribution::{ContinuousCDF, Normal};

use metric_core::models::SigConfidenceLevel;

/// Two-tailed critical value of the standard normal at `level`:
/// the `1 - alpha/2` quantile.
pub fn critical_value(level: SigConfidenceLevel) -> f64 {
    static CRITICAL: OnceLock<[f64; 4]> = OnceLock::new();
    let values = CRITICAL.get_or_init(|| {
        let normal = Normal::standard();
        SigConfidenceLevel::ALL.map(|level| {
            let alpha = 1.0 - level.confidence();
            normal.inverse_cdf(1.0 - alpha / 2.0)
        })
    });
    values[level as usize]
}
