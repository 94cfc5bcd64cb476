use tracing::debug;

use metric_core::models::{DataTarget, SubsetId};
use metric_entity::EntityInstanceRepository;

/// Widen fetch targets with the next instances of their entity type, so the
/// following request for a neighbouring instance is already loaded.
///
/// A target is widened only when its type is not excluded and it asks for at
/// most `batch` ids. The added ids are the next `batch` ids of that type in
/// `subset` above the largest requested id.
pub fn expand_adjacent(
    targets: &[DataTarget],
    instances: &EntityInstanceRepository,
    subset: &SubsetId,
    batch: usize,
    excluded_types: &[String],
) -> Vec<DataTarget> {
    targets
        .iter()
        .map(|target| {
            let eligible = batch > 0
                && target.instance_ids.len() <= batch
                && !excluded_types.iter().any(|t| *t == target.entity_type);
            let Some(largest) = target.instance_ids.last().copied().filter(|_| eligible) else {
                return target.clone();
            };
            let extra = instances.ids_after(&target.entity_type, subset, largest, batch);
            if extra.is_empty() {
                return target.clone();
            }
            debug!(
                entity_type = %target.entity_type,
                requested = target.instance_ids.len(),
                prefetched = extra.len(),
                "prefetching adjacent instances"
            );
            let mut widened = target.clone();
            widened.instance_ids.extend(extra);
            widened
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use metric_core::models::EntityInstance;

    use super::*;

    fn repository() -> EntityInstanceRepository {
        let mut instances = EntityInstanceRepository::new();
        for id in 1..=40 {
            instances.add("region", EntityInstance::new(id, format!("Region {id}")));
            instances.add("brand", EntityInstance::new(id, format!("Brand {id}")));
        }
        instances
    }

    #[test]
    fn adds_the_next_batch_above_the_largest_id() {
        let subset = SubsetId::new("uk");
        let targets = expand_adjacent(
            &[DataTarget::new("region", [2, 5])],
            &repository(),
            &subset,
            15,
            &["brand".to_string()],
        );
        let ids: Vec<i32> = targets[0].instance_ids.iter().copied().collect();
        assert_eq!(ids, [2].into_iter().chain(5..=20).collect::<Vec<_>>());
    }

    #[test]
    fn excluded_types_and_large_requests_are_left_alone() {
        let subset = SubsetId::new("uk");
        let brand = DataTarget::new("brand", [1]);
        let wide_region = DataTarget::new("region", 1..=20);
        let targets = expand_adjacent(
            &[brand.clone(), wide_region.clone()],
            &repository(),
            &subset,
            15,
            &["brand".to_string()],
        );
        assert_eq!(targets, vec![brand, wide_region]);
    }

    #[test]
    fn stops_at_the_last_instance() {
        let subset = SubsetId::new("uk");
        let targets = expand_adjacent(&[DataTarget::new("region", [38])], &repository(), &subset, 15, &[]);
        assert_eq!(targets[0].instance_ids.len(), 3);
    }
}
