use crate::ecs::{Component, ComponentKind, TickContext};
use crate::error::EngineError;

/// Behaviour bound to one or more component kinds.
///
/// The registry runs aspects in descending [`priority`](Aspect::priority).
/// Within an aspect, every component of the first target kind is handled
/// before the aspect moves on to the next kind.
pub trait Aspect: Send {
    fn name(&self) -> &str;

    /// Component kinds this aspect drives.
    fn targets(&self) -> &[ComponentKind];

    fn priority(&self) -> i32 {
        0
    }

    /// Called once per frame for every live component of a target kind.
    fn handle(
        &mut self,
        component: &mut dyn Component,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), EngineError> {
        component.update(ctx)
    }
}

/// Aspect that only forwards to each component's own `update` hook.
pub struct UpdateAspect {
    name: String,
    targets: Vec<ComponentKind>,
    priority: i32,
}

impl UpdateAspect {
    pub fn new(name: impl Into<String>, targets: impl IntoIterator<Item = ComponentKind>) -> Self {
        Self {
            name: name.into(),
            targets: targets.into_iter().collect(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Aspect for UpdateAspect {
    fn name(&self) -> &str {
        &self.name
    }

    fn targets(&self) -> &[ComponentKind] {
        &self.targets
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
