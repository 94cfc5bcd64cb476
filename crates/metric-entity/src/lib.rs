//! # metric-entity
//!
//! Entity dimensions and their instances: Cartesian combination of
//! requested dimensions, the immutable registry snapshot shared by
//! calculations, and the entity-set average-mapping graph.

pub mod combination;
pub mod entity_set;
pub mod registry;

pub use combination::{cartesian_product_size, entity_value_combinations};
pub use entity_set::{parse_instance_list, EntitySetGraph};
pub use registry::{
    EntityInstanceRepository, EntityTypeRepository, RegistrySnapshot, ResponseFieldManager,
    SharedRegistry,
};
