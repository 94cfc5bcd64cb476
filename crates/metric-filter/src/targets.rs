use std::collections::BTreeMap;

use metric_core::models::DataTarget;

/// Collapse targets to one per entity type holding the union of their
/// instance ids. The output is ordered by entity type.
pub fn merge_data_targets(targets: impl IntoIterator<Item = DataTarget>) -> Vec<DataTarget> {
    let mut merged: BTreeMap<String, DataTarget> = BTreeMap::new();
    for target in targets {
        match merged.get_mut(&target.entity_type) {
            Some(existing) => existing.instance_ids.extend(target.instance_ids),
            None => {
                merged.insert(target.entity_type.clone(), target);
            }
        }
    }
    merged.into_values().collect()
}
