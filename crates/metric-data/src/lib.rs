//! # metric-data
//!
//! Lazy access to raw survey answers.
//!
//! - `grouping`: batches fields sharing an entity-type key
//! - `fingerprint`: identity of one fetch
//! - `in_flight`: at most one running fetch per fingerprint
//! - `range_cache`: which dates are already loaded per field and instance
//! - `prefetch`: adjacent-instance expansion of fetch targets
//! - `limiter`: caps on the latest date requested
//! - `store`: per-subset merged response records
//! - `loader`: `LazyDataLoader`, tying the above together

pub mod fingerprint;
pub mod grouping;
pub mod in_flight;
pub mod limiter;
pub mod loader;
pub mod prefetch;
pub mod range_cache;
pub mod store;

pub use fingerprint::FetchFingerprint;
pub use grouping::{group_fields, FieldGroup};
pub use in_flight::InFlightTable;
pub use limiter::{FixedDataLimiter, SyncedDataLimiter};
pub use loader::LazyDataLoader;
pub use prefetch::expand_adjacent;
pub use range_cache::{LoadedKey, LoadedRangeCache};
pub use store::ResponseStore;
