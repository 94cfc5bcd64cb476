//! Per-day, per-quota-cell running totals of evaluated responses.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use metric_core::models::ResponseId;

/// Unweighted totals of the responses allocated to one quota cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellTotals {
    pub unweighted_count: u32,
    pub value_total: f64,
    /// Sum of squared values, for the weighted standard deviation.
    pub value_squares: f64,
    #[serde(default)]
    pub response_ids: Vec<ResponseId>,
}

impl CellTotals {
    pub fn add(&mut self, response_id: ResponseId, value: f64, keep_id: bool) {
        self.unweighted_count += 1;
        self.value_total += value;
        self.value_squares += value * value;
        if keep_id {
            self.response_ids.push(response_id);
        }
    }

    pub fn merge(&mut self, other: &CellTotals) {
        self.unweighted_count += other.unweighted_count;
        self.value_total += other.value_total;
        self.value_squares += other.value_squares;
        self.response_ids.extend_from_slice(&other.response_ids);
    }

    pub fn mean(&self) -> f64 {
        if self.unweighted_count == 0 {
            0.0
        } else {
            self.value_total / f64::from(self.unweighted_count)
        }
    }
}

/// Cell key -> totals. Ordered so float sums are reproducible.
pub type CellTotalsByKey = BTreeMap<String, CellTotals>;

/// Merge `from` into `into`, cell by cell.
pub fn merge_cells(into: &mut CellTotalsByKey, from: &CellTotalsByKey) {
    for (key, totals) in from {
        into.entry(key.clone()).or_default().merge(totals);
    }
}

/// Totals for one target combination, bucketed per calendar day.
#[derive(Debug, Clone, Default)]
pub struct CellAccumulator {
    by_day: BTreeMap<NaiveDate, CellTotalsByKey>,
    keep_ids: bool,
}

impl CellAccumulator {
    pub fn new(keep_ids: bool) -> Self {
        Self {
            by_day: BTreeMap::new(),
            keep_ids,
        }
    }

    pub fn add(&mut self, date: NaiveDate, cell_key: &str, response_id: ResponseId, value: f64) {
        let day = self.by_day.entry(date).or_default();
        match day.get_mut(cell_key) {
            Some(totals) => totals.add(response_id, value, self.keep_ids),
            None => {
                let mut totals = CellTotals::default();
                totals.add(response_id, value, self.keep_ids);
                day.insert(cell_key.to_string(), totals);
            }
        }
    }

    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &CellTotalsByKey)> {
        self.by_day.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    /// Cell totals summed over the inclusive day range.
    pub fn sum_range(&self, start: NaiveDate, end: NaiveDate) -> CellTotalsByKey {
        let mut summed = CellTotalsByKey::new();
        if start > end {
            return summed;
        }
        for (_, cells) in self.by_day.range(start..=end) {
            merge_cells(&mut summed, cells);
        }
        summed
    }

    pub fn into_days(self) -> BTreeMap<NaiveDate, CellTotalsByKey> {
        self.by_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn sums_only_days_in_range() {
        let mut acc = CellAccumulator::new(true);
        acc.add(day(1), "a", 1, 1.0);
        acc.add(day(2), "a", 2, 0.0);
        acc.add(day(2), "b", 3, 1.0);
        acc.add(day(5), "a", 4, 1.0);

        let summed = acc.sum_range(day(1), day(3));
        assert_eq!(summed["a"].unweighted_count, 2);
        assert_eq!(summed["a"].value_total, 1.0);
        assert_eq!(summed["a"].response_ids, vec![1, 2]);
        assert_eq!(summed["b"].unweighted_count, 1);
        assert!(acc.sum_range(day(3), day(1)).is_empty());
    }

    #[test]
    fn ids_dropped_unless_kept() {
        let mut acc = CellAccumulator::new(false);
        acc.add(day(1), "a", 7, 3.0);
        let summed = acc.sum_range(day(1), day(1));
        assert!(summed["a"].response_ids.is_empty());
        assert_eq!(summed["a"].value_squares, 9.0);
        assert_eq!(summed["a"].mean(), 3.0);
    }
}
