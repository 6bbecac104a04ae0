//! Sora Engine Core
//!
//! Contains the simulation core of the 2D engine:
//! - Component registry with priority-ordered aspects
//! - Layered, chunked world model with deferred mutation
//! - Typed signal bus
//! - AABB interaction field
//! - Frame time, math and the collaborator traits backends implement

pub mod command;
pub mod ecs;
pub mod engine;
pub mod entity;
pub mod error;
pub mod ids;
pub mod interfaces;
pub mod math;
pub mod physics;
pub mod signal;
pub mod time;
pub mod world;

pub use engine::{Engine, EngineOptions, StopHandle};
pub use error::EngineError;
pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
