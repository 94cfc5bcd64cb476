use metric_core::models::{CalculationType, WeightedDailyResult};

/// t-score of the change from `previous` to `current`. `None` when either
/// side has no sample, the variance model is undefined, or the calculation
/// type has no test.
///
/// NPS uses the per-period spread of the +1/0/-1 scores when both sides
/// carry one, and a pooled model on the absolute score otherwise.
pub fn t_score(
    calculation_type: CalculationType,
    current: &WeightedDailyResult,
    previous: &WeightedDailyResult,
) -> Option<f64> {
    if current.unweighted_sample_size == 0 || previous.unweighted_sample_size == 0 {
        return None;
    }
    let n1 = f64::from(current.unweighted_sample_size);
    let n2 = f64::from(previous.unweighted_sample_size);
    let (r1, r2) = (current.weighted_result, previous.weighted_result);

    let (difference, standard_error) = match calculation_type {
        CalculationType::YesNo => {
            let pooled = (r1 * n1 + r2 * n2) / (n1 + n2);
            let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
            (r1 - r2, se)
        }
        CalculationType::Average => {
            let s1 = current.standard_deviation?;
            let s2 = previous.standard_deviation?;
            (r1 - r2, (s1 * s1 / n1 + s2 * s2 / n2).sqrt())
        }
        CalculationType::NetPromoterScore => match (current.standard_deviation, previous.standard_deviation) {
            (Some(s1), Some(s2)) => (r1 - r2, (s1 * s1 / n1 + s2 * s2 / n2).sqrt()),
            _ => {
                // Without the promoter/detractor split, the spread of a score
                // q is at least |q|(1 - |q|): the minority side is empty.
                let (q1, q2) = (r1 / 100.0, r2 / 100.0);
                let pooled = ((q1 * n1 + q2 * n2) / (n1 + n2)).abs();
                (q1 - q2, (pooled * (1.0 - pooled) / (n1 + n2)).sqrt())
            }
        },
        CalculationType::Text => return None,
    };

    if !standard_error.is_finite() || standard_error <= 0.0 {
        return None;
    }
    let t = difference / standard_error;
    t.is_finite().then_some(t)
}
