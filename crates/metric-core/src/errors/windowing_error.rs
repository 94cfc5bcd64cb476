use chrono::NaiveDate;

/// Average/period windowing errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowingError {
    #[error("make-up-to {make_up_to} is not valid for totalisation unit {unit}")]
    InvalidMakeUpTo { unit: String, make_up_to: String },

    #[error("calculation period start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("average {average_id} has zero periods")]
    ZeroPeriods { average_id: String },

    #[error("date arithmetic overflowed near {date}")]
    DateOutOfRange { date: NaiveDate },
}
