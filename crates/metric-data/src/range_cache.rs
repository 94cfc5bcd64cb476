use moka::sync::Cache;

use metric_core::models::{DateRange, EntityIds, SubsetId};

/// One field answered for one combination of instance ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadedKey {
    pub subset: SubsetId,
    pub field: String,
    pub entity_key: String,
    pub instance_ids: EntityIds,
}

impl LoadedKey {
    pub fn new(subset: &SubsetId, field: &str, entity_key: &str, instance_ids: EntityIds) -> Self {
        Self {
            subset: subset.clone(),
            field: field.to_string(),
            entity_key: entity_key.to_string(),
            instance_ids,
        }
    }
}

/// Date ranges already loaded per (subset, field, instance ids). Eviction
/// only costs a refetch.
#[derive(Clone)]
pub struct LoadedRangeCache {
    ranges: Cache<LoadedKey, Vec<DateRange>>,
}

impl std::fmt::Debug for LoadedRangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedRangeCache")
            .field("entries", &self.ranges.entry_count())
            .finish()
    }
}

impl LoadedRangeCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            ranges: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Whether `range` has been loaded in full for `key`.
    pub fn covers(&self, key: &LoadedKey, range: &DateRange) -> bool {
        self.ranges
            .get(key)
            .is_some_and(|loaded| loaded.iter().any(|r| r.covers(range)))
    }

    /// Record `range` as loaded for `key`, merging touching ranges.
    pub fn record(&self, key: LoadedKey, range: DateRange) {
        self.ranges.entry(key).and_upsert_with(|existing| {
            let mut ranges = existing.map(|e| e.into_value()).unwrap_or_default();
            merge_range(&mut ranges, range);
            ranges
        });
    }

    /// Loaded ranges for `key`, ascending.
    pub fn loaded(&self, key: &LoadedKey) -> Vec<DateRange> {
        self.ranges.get(key).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.ranges.invalidate_all();
    }
}

fn merge_range(ranges: &mut Vec<DateRange>, range: DateRange) {
    let mut merged = range;
    ranges.retain(|existing| {
        if existing.touches(&merged) {
            merged = merged.union(existing);
            false
        } else {
            true
        }
    });
    let position = ranges.partition_point(|r| r.start < merged.start);
    ranges.insert(position, merged);
}
