use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::defaults;

/// Lazy data access configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Fields sharing an entity-type key are fetched in chunks of this size.
    pub field_chunk_size: usize,
    /// Extra instances loaded per dimension by the adjacent-entity prefetch.
    pub adjacent_prefetch_batch: usize,
    /// Entity type ids never expanded by the prefetch.
    pub prefetch_excluded_entity_types: Vec<String>,
    /// Concurrent loads allowed before callers get `TooBusy`.
    pub max_concurrent_loads: usize,
    /// Largest target cartesian product a single load may request.
    pub max_cartesian_product: usize,
    /// Entries kept by the loaded-range cache.
    pub loaded_range_cache_capacity: u64,
    /// Fixed cap on the end of every requested date range.
    pub latest_date_to_request: Option<NaiveDate>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            field_chunk_size: defaults::DEFAULT_FIELD_CHUNK_SIZE,
            adjacent_prefetch_batch: defaults::DEFAULT_ADJACENT_PREFETCH_BATCH,
            prefetch_excluded_entity_types: defaults::default_prefetch_excluded_types(),
            max_concurrent_loads: defaults::DEFAULT_MAX_CONCURRENT_LOADS,
            max_cartesian_product: defaults::DEFAULT_MAX_CARTESIAN_PRODUCT,
            loaded_range_cache_capacity: defaults::DEFAULT_LOADED_RANGE_CACHE_CAPACITY,
            latest_date_to_request: None,
        }
    }
}
