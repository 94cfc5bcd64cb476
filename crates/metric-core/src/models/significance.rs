use serde::{Deserialize, Serialize};

/// Verdict of a period-over-period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Significance {
    Up,
    Down,
    None,
}

/// Two-tailed confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SigConfidenceLevel {
    Ninety,
    NinetyFive,
    NinetyEight,
    NinetyNine,
}

impl SigConfidenceLevel {
    pub const ALL: [SigConfidenceLevel; 4] = [
        Self::Ninety,
        Self::NinetyFive,
        Self::NinetyEight,
        Self::NinetyNine,
    ];

    /// Confidence as a fraction, e.g. 0.95.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Ninety => 0.90,
            Self::NinetyFive => 0.95,
            Self::NinetyEight => 0.98,
            Self::NinetyNine => 0.99,
        }
    }
}
