use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::WindowingError;

/// Unit a rolling window is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TotalisationPeriodUnit {
    Day,
    Month,
    /// One window covering the whole requested period.
    All,
}

impl fmt::Display for TotalisationPeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Calendar boundary result dates are aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MakeUpTo {
    Day,
    WeekEnd,
    MonthEnd,
    QuarterEnd,
    HalfYearEnd,
    CalendarYearEnd,
}

impl fmt::Display for MakeUpTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether quota weighting is computed per window or across all windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightAcross {
    SinglePeriod,
    AllPeriods,
}

/// An averaging cadence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AverageDescriptor {
    pub average_id: String,
    pub display_name: String,
    pub total_period_unit: TotalisationPeriodUnit,
    pub number_of_periods_in_average: u32,
    pub make_up_to: MakeUpTo,
    pub weight_across: WeightAcross,
    #[serde(default)]
    pub include_response_ids: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl AverageDescriptor {
    pub fn new(
        average_id: impl Into<String>,
        total_period_unit: TotalisationPeriodUnit,
        number_of_periods_in_average: u32,
        make_up_to: MakeUpTo,
    ) -> Self {
        let average_id = average_id.into();
        Self {
            display_name: average_id.clone(),
            average_id,
            total_period_unit,
            number_of_periods_in_average,
            make_up_to,
            weight_across: WeightAcross::SinglePeriod,
            include_response_ids: false,
            disabled: false,
        }
    }

    pub fn with_response_ids(mut self) -> Self {
        self.include_response_ids = true;
        self
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two ranges overlap or touch.
    pub fn touches(&self, other: &DateRange) -> bool {
        let end_plus_one = self.end.succ_opt().unwrap_or(self.end);
        let other_end_plus_one = other.end.succ_opt().unwrap_or(other.end);
        self.start <= other_end_plus_one && other.start <= end_plus_one
    }

    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// The requested span of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalculationPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalculationPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowingError> {
        if start > end {
            return Err(WindowingError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn as_range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}
