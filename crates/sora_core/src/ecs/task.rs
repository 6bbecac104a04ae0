//! Task components: user callables run once per frame by [`TaskAspect`].
//!
//! This is the extension point for game logic that doesn't deserve its own
//! component type.

use crate::define_component;
use crate::ecs::{Aspect, Component, ComponentKind, ComponentType, TickContext};
use crate::error::EngineError;

pub type TaskFn = Box<dyn FnMut(&mut TickContext<'_>) -> Result<(), EngineError> + Send>;

pub struct Task {
    name: String,
    func: TaskFn,
    runs: u64,
}

define_component!(Task, "Task");

impl Task {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&mut TickContext<'_>) -> Result<(), EngineError> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
            runs: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times the task has run.
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl Component for Task {
    fn kind(&self) -> ComponentKind {
        Self::KIND
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
        self.runs += 1;
        (self.func)(ctx)
    }
}

/// Runs every [`Task`] each frame.
pub struct TaskAspect {
    priority: i32,
    targets: [ComponentKind; 1],
}

impl TaskAspect {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            targets: [Task::KIND],
        }
    }
}

impl Default for TaskAspect {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Aspect for TaskAspect {
    fn name(&self) -> &str {
        "TaskAspect"
    }

    fn targets(&self) -> &[ComponentKind] {
        &self.targets
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn handle(
        &mut self,
        component: &mut dyn Component,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(task) = component.downcast_mut::<Task>() else {
            return Ok(());
        };
        task.update(ctx).map_err(|err| match err {
            EngineError::Task { .. } => err,
            other => EngineError::Task {
                name: task.name.clone(),
                message: other.to_string(),
            },
        })
    }
}
