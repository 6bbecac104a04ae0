//! Entity Component System core types.
//!
//! Components are trait objects owned by the [`EcsRegistry`] and bucketed by
//! [`ComponentKind`]. Aspects declare the kinds they drive and run in
//! priority order once per frame. Anything a component does to the structure
//! of the world (spawning, despawning, attaching, detaching) is queued in the
//! frame's [`Commands`](crate::command::Commands) and applied after the sweep.

mod aspect;
mod component;
mod context;
mod ecs_error;
mod registry;
mod task;

pub use aspect::{Aspect, UpdateAspect};
pub use component::{AsAny, Component, ComponentKind, ComponentType};
pub use context::{FrameContext, TickContext};
pub use ecs_error::EcsError;
pub use registry::EcsRegistry;
pub use task::{Task, TaskAspect, TaskFn};

pub use crate::ids::{AspectId, ComponentId};
