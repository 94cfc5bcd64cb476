//! Cartesian product properties of the entity combination engine.

use std::collections::HashSet;

use proptest::prelude::*;

use metric_core::errors::EntityError;
use metric_core::models::{EntityInstance, EntityType, EntityValue, EntityValueCombination, TargetInstances};
use metric_entity::entity_value_combinations;

fn target(entity_type: &str, ids: &[i32]) -> TargetInstances {
    TargetInstances::new(
        EntityType::new(entity_type, entity_type, entity_type),
        ids.iter()
            .map(|id| EntityInstance::new(*id, format!("{entity_type} {id}")))
            .collect(),
    )
}

#[test]
fn test_zero_dimensions_yield_one_empty_combination() {
    let combos = entity_value_combinations(&[]).unwrap();
    assert_eq!(combos, vec![EntityValueCombination::empty()]);
}

#[test]
fn test_profile_dimension_always_fails() {
    let profile = TargetInstances::new(EntityType::profile(), vec![EntityInstance::new(1, "me")]);
    for targets in [
        vec![profile.clone()],
        vec![target("brand", &[1, 2]), profile.clone()],
    ] {
        let err = entity_value_combinations(&targets).unwrap_err();
        assert_eq!(
            err,
            EntityError::ProfileDimension {
                entity_type: "profile".to_string()
            }
        );
    }
}

#[test]
fn test_two_by_three_product() {
    let combos =
        entity_value_combinations(&[target("brand", &[1, 2]), target("product", &[5, 6, 10])])
            .unwrap();
    let actual: HashSet<EntityValueCombination> = combos.into_iter().collect();
    let mut expected = HashSet::new();
    for brand in [1, 2] {
        for product in [5, 6, 10] {
            expected.insert(
                EntityValueCombination::try_from_values([
                    EntityValue::new("brand", brand),
                    EntityValue::new("product", product),
                ])
                .unwrap(),
            );
        }
    }
    assert_eq!(actual, expected);
}

fn dimensions() -> impl Strategy<Value = Vec<Vec<i32>>> {
    proptest::collection::vec(
        proptest::collection::btree_set(0i32..50, 0..5).prop_map(|s| s.into_iter().collect()),
        0..4,
    )
}

proptest! {
    #[test]
    fn prop_product_size_and_shape(dims in dimensions()) {
        let targets: Vec<TargetInstances> = dims
            .iter()
            .enumerate()
            .map(|(i, ids)| target(&format!("type{i}"), ids))
            .collect();
        let combos = entity_value_combinations(&targets).unwrap();

        let expected: usize = dims.iter().map(Vec::len).product();
        prop_assert_eq!(combos.len(), expected);
        for combo in &combos {
            prop_assert_eq!(combo.len(), dims.len());
            for (i, ids) in dims.iter().enumerate() {
                let id = combo.instance_of(&format!("type{i}"));
                prop_assert!(id.is_some_and(|id| ids.contains(&id)));
            }
        }
        let distinct: HashSet<_> = combos.iter().collect();
        prop_assert_eq!(distinct.len(), combos.len());
    }

    #[test]
    fn prop_dimension_order_does_not_change_the_set(dims in dimensions()) {
        let targets: Vec<TargetInstances> = dims
            .iter()
            .enumerate()
            .map(|(i, ids)| target(&format!("type{i}"), ids))
            .collect();
        let reversed: Vec<TargetInstances> = targets.iter().rev().cloned().collect();
        let forward: HashSet<_> = entity_value_combinations(&targets).unwrap().into_iter().collect();
        let backward: HashSet<_> = entity_value_combinations(&reversed).unwrap().into_iter().collect();
        prop_assert_eq!(forward, backward);
    }
}
