//! # metric-weighting
//!
//! Turns per-response measure values into weighted results.
//!
//! - `quota_scheme`: allocates responses to demographic quota cells
//! - `repository` / `reference`: per-subset reference weightings
//! - `accumulate`: per-day, per-cell running totals
//! - `weigher`: Standard and ResponseLevel weighting of cell totals
//! - `market_average`: blends per-entity results into one series
//! - `blend`: explicit entity x cell weight grid for relative-size blends

pub mod accumulate;
pub mod blend;
pub mod market_average;
pub mod quota_scheme;
pub mod reference;
pub mod repository;
pub mod stats;
pub mod weigher;

pub use accumulate::{merge_cells, CellAccumulator, CellTotals, CellTotalsByKey};
pub use blend::{blend_weights, BlendWeights, CellMix, CellShare, EntityCellTargets};
pub use market_average::{calculate_market_average, MarketAverage, RelativeSizes};
pub use quota_scheme::{QuotaCellScheme, QuotaDimension};
pub use reference::ReferenceWeightingCalculator;
pub use repository::InMemoryReferenceWeightingRepository;
pub use weigher::{CellWeights, QuotaWeigher};
