//! # metric-windowing
//!
//! Maps a requested period and an averaging cadence onto calendar-aligned
//! result windows, and rolls per-day cell totals up into those windows.

pub mod calendar;
pub mod defaults;
pub mod result_date;
pub mod roll_up;
pub mod windower;

pub use defaults::default_averages;
pub use result_date::ResultDateCalculator;
pub use roll_up::{across_windows, roll_up, WindowTotals};
pub use windower::{ResultWindow, Windower};
