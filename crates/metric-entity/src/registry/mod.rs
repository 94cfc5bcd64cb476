//! Entity and field registries.
//!
//! Repositories are built once per data refresh and then only read. A
//! refresh builds a new `RegistrySnapshot` and swaps it into the
//! `SharedRegistry`; calculations already running keep the snapshot they
//! started with.

pub mod entity_instances;
pub mod entity_types;
pub mod field_manager;
pub mod snapshot;

pub use entity_instances::EntityInstanceRepository;
pub use entity_types::EntityTypeRepository;
pub use field_manager::ResponseFieldManager;
pub use snapshot::{RegistrySnapshot, SharedRegistry};
