//! Cartesian product of requested entity dimensions.

use metric_core::errors::EntityError;
use metric_core::models::{EntityValue, EntityValueCombination, TargetInstances};

/// Every joint combination of the instances in `targets`.
///
/// Zero dimensions yields a single empty combination. A profile dimension
/// is rejected: profile data is addressed per response and never
/// enumerated. The first dimension varies fastest; callers must not rely
/// on the order.
pub fn entity_value_combinations(
    targets: &[TargetInstances],
) -> Result<Vec<EntityValueCombination>, EntityError> {
    if let Some(profile) = targets.iter().find(|t| t.entity_type.is_profile) {
        return Err(EntityError::ProfileDimension {
            entity_type: profile.entity_type.id.clone(),
        });
    }

    let mut combinations = vec![EntityValueCombination::empty()];
    for target in targets {
        let mut next = Vec::with_capacity(combinations.len() * target.instances.len());
        for instance in &target.instances {
            let value = EntityValue::new(target.entity_type.id.clone(), instance.id);
            for combination in &combinations {
                next.push(combination.with(value.clone())?);
            }
        }
        combinations = next;
    }
    Ok(combinations)
}

/// Number of combinations `entity_value_combinations` would produce,
/// saturating instead of overflowing.
pub fn cartesian_product_size(targets: &[TargetInstances]) -> usize {
    targets
        .iter()
        .fold(1usize, |size, t| size.saturating_mul(t.instances.len()))
}
