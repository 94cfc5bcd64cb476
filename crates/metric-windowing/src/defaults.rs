//! The standard set of averaging cadences.

use metric_core::models::{AverageDescriptor, MakeUpTo, TotalisationPeriodUnit, WeightAcross};

pub const CUSTOM_PERIOD_AVERAGE_ID: &str = "CustomPeriod";

fn average(
    id: &str,
    display_name: &str,
    unit: TotalisationPeriodUnit,
    periods: u32,
    make_up_to: MakeUpTo,
    weight_across: WeightAcross,
    disabled: bool,
) -> AverageDescriptor {
    let mut descriptor = AverageDescriptor::new(id, unit, periods, make_up_to);
    descriptor.display_name = display_name.to_string();
    descriptor.weight_across = weight_across;
    descriptor.disabled = disabled;
    descriptor
}

/// Every built-in cadence. Rarely used ones are present but disabled.
pub fn default_averages() -> Vec<AverageDescriptor> {
    use MakeUpTo::{CalendarYearEnd, HalfYearEnd, MonthEnd, QuarterEnd, WeekEnd};
    use TotalisationPeriodUnit::{All, Day, Month};
    use WeightAcross::{AllPeriods, SinglePeriod};

    vec![
        average("14Days", "14 days", Day, 14, MakeUpTo::Day, AllPeriods, false),
        average("28Days", "28 days", Day, 28, MakeUpTo::Day, AllPeriods, false),
        average("12Weeks", "12 weeks", Day, 84, MakeUpTo::Day, AllPeriods, true),
        average("Weekly", "Weekly", Day, 7, WeekEnd, SinglePeriod, false),
        average("Fortnightly", "Fortnightly", Day, 14, WeekEnd, SinglePeriod, true),
        average("Monthly", "Monthly", Month, 1, MonthEnd, SinglePeriod, false),
        average("MonthlyOver3Months", "Monthly (over 3 months)", Month, 3, MonthEnd, SinglePeriod, false),
        average("MonthlyOver6Months", "Monthly (over 6 months)", Month, 6, MonthEnd, SinglePeriod, true),
        average("MonthlyOver12Months", "Monthly (over 12 months)", Month, 12, MonthEnd, SinglePeriod, true),
        average("Quarterly", "Quarterly", Month, 3, QuarterEnd, SinglePeriod, false),
        average("HalfYearly", "HalfYearly", Month, 6, HalfYearEnd, SinglePeriod, false),
        average("Annual", "Annual", Month, 12, CalendarYearEnd, SinglePeriod, true),
        average(CUSTOM_PERIOD_AVERAGE_ID, "Custom Period", All, 1, MakeUpTo::Day, AllPeriods, false),
    ]
}
