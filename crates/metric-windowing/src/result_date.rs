//! First and last result dates of an averaging cadence.

use chrono::NaiveDate;

use metric_core::errors::WindowingError;
use metric_core::models::{AverageDescriptor, MakeUpTo, TotalisationPeriodUnit};

use crate::calendar;

pub struct ResultDateCalculator;

impl ResultDateCalculator {
    /// Start of the first admissible window.
    ///
    /// Month-unit windows are reported as the end of their first month.
    /// Day-unit windows are reported as their first day. A window is
    /// admissible when it starts no earlier than the dataset and measure
    /// start dates.
    pub fn first(
        descriptor: &AverageDescriptor,
        measure_start: Option<NaiveDate>,
        dataset_start: NaiveDate,
        requested_start: NaiveDate,
    ) -> Result<NaiveDate, WindowingError> {
        check_descriptor(descriptor)?;
        let bound = measure_start.map_or(dataset_start, |m| m.max(dataset_start));
        let periods = descriptor.number_of_periods_in_average;
        let overflow = || WindowingError::DateOutOfRange {
            date: requested_start,
        };

        match descriptor.total_period_unit {
            TotalisationPeriodUnit::All => Ok(requested_start.max(bound)),
            TotalisationPeriodUnit::Day => {
                let requested_window_start =
                    calendar::add_days(requested_start, 1 - i64::from(periods)).ok_or_else(overflow)?;
                Ok(requested_window_start.max(bound))
            }
            TotalisationPeriodUnit::Month => {
                let first_full_month = if bound == calendar::first_of_month(bound) {
                    bound
                } else {
                    calendar::add_months(bound, 1).ok_or_else(overflow)?
                };
                let earliest_end = calendar::end_of_month(
                    calendar::add_months(first_full_month, periods as i32 - 1).ok_or_else(overflow)?,
                )
                .ok_or_else(overflow)?;
                let result_date =
                    calendar::align_up(requested_start.max(earliest_end), descriptor.make_up_to)
                        .ok_or_else(overflow)?;
                let window_start = calendar::add_months(result_date, 1 - periods as i32).ok_or_else(overflow)?;
                calendar::end_of_month(window_start).ok_or_else(overflow)
            }
        }
    }

    /// The last result date on or before `requested_end`.
    pub fn last(
        requested_end: NaiveDate,
        descriptor: &AverageDescriptor,
    ) -> Result<NaiveDate, WindowingError> {
        check_descriptor(descriptor)?;
        if descriptor.total_period_unit == TotalisationPeriodUnit::All {
            return Ok(requested_end);
        }
        calendar::align_down(requested_end, descriptor.make_up_to).ok_or(
            WindowingError::DateOutOfRange {
                date: requested_end,
            },
        )
    }
}

pub(crate) fn check_descriptor(descriptor: &AverageDescriptor) -> Result<(), WindowingError> {
    if descriptor.number_of_periods_in_average == 0 {
        return Err(WindowingError::ZeroPeriods {
            average_id: descriptor.average_id.clone(),
        });
    }
    if descriptor.total_period_unit == TotalisationPeriodUnit::Month
        && matches!(descriptor.make_up_to, MakeUpTo::Day | MakeUpTo::WeekEnd)
    {
        return Err(WindowingError::InvalidMakeUpTo {
            unit: descriptor.total_period_unit.to_string(),
            make_up_to: descriptor.make_up_to.to_string(),
        });
    }
    Ok(())
}
