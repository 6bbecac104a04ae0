use crate::ecs::ComponentKind;
use crate::ids::{ComponentId, EntityId};
use thiserror::Error;

/// Errors raised by the component registry.
#[derive(Debug, Error)]
pub enum EcsError {
    /// No bucket exists for the kind; usually a forgotten aspect registration.
    #[error("component type '{kind}' has no registered storage")]
    UnknownComponentType { kind: ComponentKind },

    #[error("component {id} is not registered under '{kind}'")]
    UnknownComponent { kind: ComponentKind, id: ComponentId },

    #[error("component {id} is registered as '{actual}', not '{requested}'")]
    KindMismatch {
        id: ComponentId,
        requested: ComponentKind,
        actual: ComponentKind,
    },

    #[error("entity {id} is not present")]
    UnknownEntity { id: EntityId },
}
