//! Calendar arithmetic on `NaiveDate`. Every helper returns `None` when the
//! result falls outside chrono's supported range.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use metric_core::models::MakeUpTo;

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> Option<NaiveDate> {
    first_of_month(date)
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// First day of the month `months` after (or before, if negative) `date`'s month.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let first = first_of_month(date);
    if months >= 0 {
        first.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        first.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.day() == 1)
}

/// Whether `date` is a result date for the boundary.
pub fn is_aligned(date: NaiveDate, make_up_to: MakeUpTo) -> bool {
    match make_up_to {
        MakeUpTo::Day => true,
        MakeUpTo::WeekEnd => date.weekday() == Weekday::Sun,
        MakeUpTo::MonthEnd => is_month_end(date),
        MakeUpTo::QuarterEnd => is_month_end(date) && date.month() % 3 == 0,
        MakeUpTo::HalfYearEnd => is_month_end(date) && date.month() % 6 == 0,
        MakeUpTo::CalendarYearEnd => is_month_end(date) && date.month() == 12,
    }
}

fn month_step(make_up_to: MakeUpTo) -> u32 {
    match make_up_to {
        MakeUpTo::QuarterEnd => 3,
        MakeUpTo::HalfYearEnd => 6,
        MakeUpTo::CalendarYearEnd => 12,
        _ => 1,
    }
}

/// The first result date on or after `date`.
pub fn align_up(date: NaiveDate, make_up_to: MakeUpTo) -> Option<NaiveDate> {
    match make_up_to {
        MakeUpTo::Day => Some(date),
        MakeUpTo::WeekEnd => {
            let ahead = 6 - i64::from(date.weekday().num_days_from_monday());
            add_days(date, ahead)
        }
        _ => {
            let step = month_step(make_up_to);
            let ahead = (step - date.month() % step) % step;
            end_of_month(add_months(date, ahead as i32)?)
        }
    }
}

/// The last result date on or before `date`.
pub fn align_down(date: NaiveDate, make_up_to: MakeUpTo) -> Option<NaiveDate> {
    if is_aligned(date, make_up_to) {
        return Some(date);
    }
    match make_up_to {
        MakeUpTo::Day => Some(date),
        MakeUpTo::WeekEnd => add_days(date, -1 - i64::from(date.weekday().num_days_from_monday())),
        _ => {
            let step = month_step(make_up_to);
            let behind = date.month() % step;
            let behind = if behind == 0 { step } else { behind };
            end_of_month(add_months(date, -(behind as i32))?)
        }
    }
}

/// The result date following `date`, which must itself be aligned.
pub fn next_aligned(date: NaiveDate, make_up_to: MakeUpTo) -> Option<NaiveDate> {
    align_up(date.succ_opt()?, make_up_to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_ends() {
        assert_eq!(end_of_month(d(2024, 2, 10)), Some(d(2024, 2, 29)));
        assert_eq!(end_of_month(d(2023, 12, 31)), Some(d(2023, 12, 31)));
        assert_eq!(add_months(d(2024, 1, 31), -2), Some(d(2023, 11, 1)));
    }

    #[test]
    fn aligns_up_to_boundaries() {
        assert_eq!(align_up(d(2017, 11, 20), MakeUpTo::QuarterEnd), Some(d(2017, 12, 31)));
        assert_eq!(align_up(d(2017, 12, 31), MakeUpTo::QuarterEnd), Some(d(2017, 12, 31)));
        assert_eq!(align_up(d(2018, 1, 1), MakeUpTo::HalfYearEnd), Some(d(2018, 6, 30)));
        assert_eq!(align_up(d(2017, 6, 1), MakeUpTo::CalendarYearEnd), Some(d(2017, 12, 31)));
        // 2024-03-06 is a Wednesday.
        assert_eq!(align_up(d(2024, 3, 6), MakeUpTo::WeekEnd), Some(d(2024, 3, 10)));
        assert_eq!(align_up(d(2024, 3, 10), MakeUpTo::WeekEnd), Some(d(2024, 3, 10)));
    }

    #[test]
    fn aligns_down_to_boundaries() {
        assert_eq!(align_down(d(2019, 1, 31), MakeUpTo::QuarterEnd), Some(d(2018, 12, 31)));
        assert_eq!(align_down(d(2019, 1, 30), MakeUpTo::MonthEnd), Some(d(2018, 12, 31)));
        assert_eq!(align_down(d(2018, 6, 30), MakeUpTo::HalfYearEnd), Some(d(2018, 6, 30)));
        assert_eq!(align_down(d(2024, 3, 6), MakeUpTo::WeekEnd), Some(d(2024, 3, 3)));
        assert_eq!(next_aligned(d(2018, 3, 31), MakeUpTo::QuarterEnd), Some(d(2018, 6, 30)));
    }
}
