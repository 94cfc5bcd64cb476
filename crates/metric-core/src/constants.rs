/// Engine version string.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier of the profile entity type. Profile data is addressed per
/// response and is never enumerated as a dimension.
pub const PROFILE_ENTITY_TYPE: &str = "profile";

/// Fields sharing an entity-type key are fetched in chunks of this size.
pub const DEFAULT_FIELD_CHUNK_SIZE: usize = 50;

/// Number of extra instances loaded by the adjacent-entity prefetch.
pub const DEFAULT_ADJACENT_PREFETCH_BATCH: usize = 15;

/// Entity types whose selection patterns make adjacent prefetch unproductive.
pub const DEFAULT_PREFETCH_EXCLUDED_TYPES: [&str; 2] = ["brand", "product"];

/// Maximum number of data loads allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 8;

/// Upper bound on the size of a target Cartesian product.
pub const DEFAULT_MAX_CARTESIAN_PRODUCT: usize = 100_000;

/// Capacity of the loaded-range cache.
pub const DEFAULT_LOADED_RANGE_CACHE_CAPACITY: u64 = 10_000;

/// Results with fewer respondents than this are considered low sample.
pub const DEFAULT_MINIMUM_SAMPLE_PER_POINT: u16 = 75;

/// Blend weights must sum to one within this tolerance.
pub const DEFAULT_WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Total weights below this are treated as zero.
pub const WEIGHT_IS_ZERO: f64 = 1e-10;

/// NPS scale bounds and classification thresholds.
pub const NPS_SCALE_MIN: f64 = 0.0;
pub const NPS_SCALE_MAX: f64 = 10.0;
pub const NPS_PROMOTER_MIN: f64 = 9.0;
pub const NPS_PASSIVE_MIN: f64 = 7.0;

/// Key of the quota cell holding responses with no demographic allocation.
pub const UNWEIGHTED_CELL_KEY: &str = "unweighted";
