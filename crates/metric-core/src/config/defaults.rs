//! Compiled defaults for every configuration section.

use crate::constants;

pub const DEFAULT_FIELD_CHUNK_SIZE: usize = constants::DEFAULT_FIELD_CHUNK_SIZE;
pub const DEFAULT_ADJACENT_PREFETCH_BATCH: usize = constants::DEFAULT_ADJACENT_PREFETCH_BATCH;
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = constants::DEFAULT_MAX_CONCURRENT_LOADS;
pub const DEFAULT_MAX_CARTESIAN_PRODUCT: usize = constants::DEFAULT_MAX_CARTESIAN_PRODUCT;
pub const DEFAULT_LOADED_RANGE_CACHE_CAPACITY: u64 = constants::DEFAULT_LOADED_RANGE_CACHE_CAPACITY;

pub const DEFAULT_MINIMUM_SAMPLE_PER_POINT: u16 = constants::DEFAULT_MINIMUM_SAMPLE_PER_POINT;
pub const DEFAULT_WEIGHT_SUM_TOLERANCE: f64 = constants::DEFAULT_WEIGHT_SUM_TOLERANCE;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn default_prefetch_excluded_types() -> Vec<String> {
    constants::DEFAULT_PREFETCH_EXCLUDED_TYPES
        .iter()
        .map(|t| t.to_string())
        .collect()
}
