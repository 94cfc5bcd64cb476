/// Entity model, registry, and entity-set errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityError {
    #[error("profile entity type {entity_type} cannot be enumerated as a dimension")]
    ProfileDimension { entity_type: String },

    #[error("entity type {entity_type} is given more than once")]
    DuplicateEntityType { entity_type: String },

    #[error("unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    #[error("unknown instance {id} of entity type {entity_type}")]
    UnknownEntityInstance { entity_type: String, id: i32 },

    #[error("field {name} is already registered")]
    DuplicateField { name: String },

    #[error("unknown field: {name}")]
    UnknownField { name: String },

    #[error("field {field} is keyed by entity type {entity_type} more than once")]
    FieldKeyedTwice { field: String, entity_type: String },

    #[error("unknown entity set: {id}")]
    UnknownEntitySet { id: i32 },

    #[error("entity set {id} is defined more than once")]
    DuplicateEntitySet { id: i32 },

    #[error("cycle detected in entity set average mappings: {path}")]
    AverageMappingCycle { path: String },

    #[error("invalid instance list {input:?}: {reason}")]
    InvalidInstanceList { input: String, reason: String },
}
