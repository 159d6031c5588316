//! Scene error types.

use flex_component::{ComponentId, EntityId, ReflectError};

/// Errors raised by scene operations and scene persistence.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity handle is stale or was never issued by this scene.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// The entity exists but does not carry the requested component.
    #[error("component {component} not present on entity {entity}")]
    ComponentNotPresent {
        /// The entity that was queried.
        entity: EntityId,
        /// The missing component.
        component: ComponentId,
    },

    /// A component name is not registered, or is registered under a
    /// different Rust type.
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    /// Two different Rust types were used under the same component name.
    #[error("component name '{0}' is already used by a different type")]
    NameCollision(String),

    /// A value could not be reflected.
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    /// Reading or writing a scene file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A scene document is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A scene document parsed but its contents are inconsistent.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Convenience alias for scene results.
pub type EcsResult<T> = Result<T, EcsError>;
