//! Partitions a requested period into result windows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use metric_core::errors::WindowingError;
use metric_core::models::{AverageDescriptor, CalculationPeriod, DateRange, TotalisationPeriodUnit};

use crate::calendar;
use crate::result_date::check_descriptor;

/// One result data point and the inclusive day span it totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultWindow {
    pub result_date: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ResultWindow {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

pub struct Windower;

impl Windower {
    /// Result windows for `descriptor` across `period`.
    ///
    /// A window is only emitted when it starts on or after both the first
    /// day of data and the measure start, so no data point is computed over
    /// a partial window. A window's span depends only on its result date.
    pub fn windows(
        descriptor: &AverageDescriptor,
        period: &CalculationPeriod,
        data_start: Option<NaiveDate>,
        measure_start: Option<NaiveDate>,
    ) -> Result<Vec<ResultWindow>, WindowingError> {
        check_descriptor(descriptor)?;
        let admissible_start = match (data_start, measure_start) {
            (Some(data), Some(measure)) => Some(data.max(measure)),
            (data, measure) => data.or(measure),
        };

        if descriptor.total_period_unit == TotalisationPeriodUnit::All {
            let start = admissible_start.map_or(period.start, |s| s.max(period.start));
            if start > period.end {
                debug!(average = %descriptor.average_id, "no data inside the custom period");
                return Ok(Vec::new());
            }
            return Ok(vec![ResultWindow {
                result_date: period.end,
                start,
                end: period.end,
            }]);
        }

        let overflow = |date| WindowingError::DateOutOfRange { date };
        let mut windows = Vec::new();
        let mut dropped = 0usize;
        let mut result_date =
            calendar::align_up(period.start, descriptor.make_up_to).ok_or(overflow(period.start))?;
        while result_date <= period.end {
            let start = window_start(descriptor, result_date).ok_or(overflow(result_date))?;
            if admissible_start.is_some_and(|bound| start < bound) {
                dropped += 1;
            } else {
                windows.push(ResultWindow {
                    result_date,
                    start,
                    end: result_date,
                });
            }
            match calendar::next_aligned(result_date, descriptor.make_up_to) {
                Some(next) => result_date = next,
                None => break,
            }
        }

        if dropped > 0 {
            debug!(
                average = %descriptor.average_id,
                dropped,
                first_admissible = ?admissible_start,
                "windows dropped for insufficient history"
            );
        }
        Ok(windows)
    }
}

/// First day of the window ending on `result_date`.
fn window_start(descriptor: &AverageDescriptor, result_date: NaiveDate) -> Option<NaiveDate> {
    let periods = descriptor.number_of_periods_in_average;
    match descriptor.total_period_unit {
        TotalisationPeriodUnit::Day => calendar::add_days(result_date, 1 - i64::from(periods)),
        TotalisationPeriodUnit::Month => calendar::add_months(result_date, 1 - periods as i32),
        TotalisationPeriodUnit::All => Some(result_date),
    }
}
