//! Crate-level error type.

use crate::ecs::EcsError;
use crate::physics::PhysicsError;
use crate::signal::SignalError;
use crate::world::WorldError;
use thiserror::Error;

/// Anything that can halt a frame.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    World(#[from] WorldError),

    /// A task callable failed.
    #[error("task '{name}' failed: {message}")]
    Task { name: String, message: String },
}

impl EngineError {
    /// Failure raised from inside a task body.
    pub fn task(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task {
            name: name.into(),
            message: message.into(),
        }
    }
}
