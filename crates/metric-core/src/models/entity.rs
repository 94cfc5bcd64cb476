use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::SubsetId;
use crate::constants::PROFILE_ENTITY_TYPE;
use crate::errors::EntityError;

/// A dimension responses can be broken out by (brand, product, profile, ...).
///
/// Compared and hashed by `id` only; display names are presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityType {
    pub id: String,
    pub display_name_singular: String,
    pub display_name_plural: String,
    #[serde(default)]
    pub is_profile: bool,
}

impl EntityType {
    pub fn new(
        id: impl Into<String>,
        display_name_singular: impl Into<String>,
        display_name_plural: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let is_profile = id == PROFILE_ENTITY_TYPE;
        Self {
            id,
            display_name_singular: display_name_singular.into(),
            display_name_plural: display_name_plural.into(),
            is_profile,
        }
    }

    /// The per-response profile type.
    pub fn profile() -> Self {
        Self::new(PROFILE_ENTITY_TYPE, "Profile", "Profiles")
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A concrete instance of an entity type, optionally scoped to some subsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityInstance {
    pub id: i32,
    pub name: String,
    /// `None` means the instance is visible in every subset.
    #[serde(default)]
    pub subsets: Option<Vec<SubsetId>>,
}

impl EntityInstance {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subsets: None,
        }
    }

    pub fn in_subsets(mut self, subsets: Vec<SubsetId>) -> Self {
        self.subsets = Some(subsets);
        self
    }

    pub fn is_in_subset(&self, subset: &SubsetId) -> bool {
        self.subsets
            .as_ref()
            .map_or(true, |subsets| subsets.contains(subset))
    }
}

/// One (entity type, instance id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityValue {
    pub entity_type: String,
    pub instance_id: i32,
}

impl EntityValue {
    pub fn new(entity_type: impl Into<String>, instance_id: i32) -> Self {
        Self {
            entity_type: entity_type.into(),
            instance_id,
        }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.instance_id)
    }
}

/// An unordered set of entity values with at most one value per entity type.
///
/// Values are kept sorted by entity type so equality and hashing do not
/// depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityValueCombination {
    values: SmallVec<[EntityValue; 2]>,
}

impl EntityValueCombination {
    /// The "no split" combination.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a combination, rejecting two values of the same entity type.
    pub fn try_from_values(
        values: impl IntoIterator<Item = EntityValue>,
    ) -> Result<Self, EntityError> {
        let mut combination = Self::empty();
        for value in values {
            combination.insert(value)?;
        }
        Ok(combination)
    }

    /// Return a copy extended with `value`.
    pub fn with(&self, value: EntityValue) -> Result<Self, EntityError> {
        let mut combination = self.clone();
        combination.insert(value)?;
        Ok(combination)
    }

    /// Union of two combinations over disjoint entity types.
    pub fn merged(&self, other: &Self) -> Result<Self, EntityError> {
        let mut combination = self.clone();
        for value in other.values.iter().cloned() {
            combination.insert(value)?;
        }
        Ok(combination)
    }

    fn insert(&mut self, value: EntityValue) -> Result<(), EntityError> {
        match self
            .values
            .binary_search_by(|v| v.entity_type.cmp(&value.entity_type))
        {
            Ok(_) => Err(EntityError::DuplicateEntityType {
                entity_type: value.entity_type,
            }),
            Err(position) => {
                self.values.insert(position, value);
                Ok(())
            }
        }
    }

    pub fn values(&self) -> &[EntityValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Instance id bound to `entity_type`, if any.
    pub fn instance_of(&self, entity_type: &str) -> Option<i32> {
        self.values
            .binary_search_by(|v| v.entity_type.as_str().cmp(entity_type))
            .ok()
            .map(|i| self.values[i].instance_id)
    }

    /// Instance ids for `entity_types`, in that order. `None` when any type is unbound.
    pub fn ids_for(&self, entity_types: &[String]) -> Option<SmallVec<[i32; 2]>> {
        entity_types
            .iter()
            .map(|t| self.instance_of(t))
            .collect()
    }
}

impl fmt::Display for EntityValueCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("}")
    }
}

/// A request for results across the listed instances of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInstances {
    pub entity_type: EntityType,
    pub instances: Vec<EntityInstance>,
}

impl TargetInstances {
    pub fn new(entity_type: EntityType, instances: Vec<EntityInstance>) -> Self {
        Self {
            entity_type,
            instances,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.instances.iter().map(|i| i.id)
    }
}

/// The set of instance ids of one entity type that must be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataTarget {
    pub entity_type: String,
    pub instance_ids: BTreeSet<i32>,
}

impl DataTarget {
    pub fn new(entity_type: impl Into<String>, instance_ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            entity_type: entity_type.into(),
            instance_ids: instance_ids.into_iter().collect(),
        }
    }
}

impl From<&TargetInstances> for DataTarget {
    fn from(target: &TargetInstances) -> Self {
        Self::new(target.entity_type.id.clone(), target.ids())
    }
}
