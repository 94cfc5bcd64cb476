//! Weighted dispersion shared by cell weighting and market averaging.

/// Weighted standard deviation and variance of `(value, weight)` pairs
/// around `mean`. `None` for fewer than two values or no weight.
pub fn weighted_standard_deviation(
    values: &[(f64, f64)],
    total_weight: f64,
    mean: f64,
) -> (Option<f64>, Option<f64>) {
    if values.len() <= 1 || total_weight <= 0.0 {
        return (None, None);
    }
    let variance = values
        .iter()
        .map(|(value, weight)| weight * (value - mean).powi(2))
        .sum::<f64>()
        / total_weight;
    (Some(variance.sqrt()), Some(variance))
}

/// `numerator / denominator`, or zero when the denominator is not positive.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
