//! Aggregates per-day cell totals into per-window totals.

use metric_weighting::{merge_cells, CellAccumulator, CellTotalsByKey};

use crate::windower::ResultWindow;

/// Cell totals of one result window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTotals {
    pub window: ResultWindow,
    pub cells: CellTotalsByKey,
}

/// Totals for each window, in window order. A window's totals depend only
/// on the days it spans.
pub fn roll_up(daily: &CellAccumulator, windows: &[ResultWindow]) -> Vec<WindowTotals> {
    windows
        .iter()
        .map(|window| WindowTotals {
            window: *window,
            cells: daily.sum_range(window.start, window.end),
        })
        .collect()
}

/// Totals over every day any window spans, for weighting across all
/// periods. Days shared by overlapping windows count once.
pub fn across_windows(daily: &CellAccumulator, windows: &[ResultWindow]) -> CellTotalsByKey {
    let mut all = CellTotalsByKey::new();
    for (_, cells) in daily
        .days()
        .filter(|(day, _)| windows.iter().any(|w| w.range().contains(**day)))
    {
        merge_cells(&mut all, cells);
    }
    all
}
