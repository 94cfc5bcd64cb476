use serde::{Deserialize, Serialize};

use super::SubsetId;

pub type EntitySetId = i32;

/// Stored configuration of a named set of entity instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySetConfiguration {
    pub id: EntitySetId,
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub subset: Option<SubsetId>,
    /// `|`-separated ids with `:` for inclusive ranges, e.g. `"1|3:5|9"`.
    #[serde(default)]
    pub instances: String,
    #[serde(default)]
    pub main_instance: Option<i32>,
    /// Sets whose instances feed this set's market average.
    #[serde(default)]
    pub child_average_mappings: Vec<EntitySetId>,
    #[serde(default)]
    pub is_disabled: bool,
}
