use metric_core::constants::{NPS_PASSIVE_MIN, NPS_PROMOTER_MIN, NPS_SCALE_MAX, NPS_SCALE_MIN};

/// Contribution of a 0-10 score to a promoter-minus-detractor tally:
/// +1 promoter, 0 passive, -1 detractor. Scores off the scale are `None`.
pub fn classify(score: f64) -> Option<f64> {
    if !(NPS_SCALE_MIN..=NPS_SCALE_MAX).contains(&score) {
        return None;
    }
    Some(if score >= NPS_PROMOTER_MIN {
        1.0
    } else if score >= NPS_PASSIVE_MIN {
        0.0
    } else {
        -1.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_bands() {
        assert_eq!(classify(10.0), Some(1.0));
        assert_eq!(classify(9.0), Some(1.0));
        assert_eq!(classify(8.0), Some(0.0));
        assert_eq!(classify(7.0), Some(0.0));
        assert_eq!(classify(6.0), Some(-1.0));
        assert_eq!(classify(0.0), Some(-1.0));
        assert_eq!(classify(11.0), None);
        assert_eq!(classify(-1.0), None);
    }

    #[test]
    fn tally_of_sample_responses() {
        let scores = [10.0, 9.0, 8.0, 7.0, 6.0, 3.0, 0.0];
        let tally: f64 = scores.iter().filter_map(|s| classify(*s)).sum();
        let nps = tally / scores.len() as f64 * 100.0;
        assert!((nps - (-14.285714285714286)).abs() < 1e-9);
    }
}
