//! Borrowed frame state handed to aspects and component hooks.

use crate::command::Commands;
use crate::entity::{Entity, EntityMap};
use crate::error::EngineError;
use crate::ids::{ComponentId, EntityId};
use crate::signal::{SignalBus, SignalValue};
use crate::time::FrameTime;

/// Everything a registry sweep may touch besides the registry itself.
///
/// Structural changes (spawning, despawning, attaching, detaching) go through
/// `commands` and are applied after the sweep, never in place.
pub struct FrameContext<'a> {
    pub entities: &'a mut EntityMap,
    pub signals: &'a mut SignalBus,
    pub commands: &'a mut Commands,
    pub time: FrameTime,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        entities: &'a mut EntityMap,
        signals: &'a mut SignalBus,
        commands: &'a mut Commands,
        time: FrameTime,
    ) -> Self {
        Self {
            entities,
            signals,
            commands,
            time,
        }
    }

    pub(crate) fn tick(&mut self, owner: EntityId, component: ComponentId) -> TickContext<'_> {
        TickContext {
            owner,
            component,
            entities: &mut *self.entities,
            signals: &mut *self.signals,
            commands: &mut *self.commands,
            time: self.time,
        }
    }
}

/// View of the frame from inside one component's hook.
pub struct TickContext<'a> {
    owner: EntityId,
    component: ComponentId,
    entities: &'a mut EntityMap,
    signals: &'a mut SignalBus,
    commands: &'a mut Commands,
    time: FrameTime,
}

impl<'a> TickContext<'a> {
    /// Entity that owns the component being updated.
    #[inline]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Id of the component being updated.
    #[inline]
    pub fn component(&self) -> ComponentId {
        self.component
    }

    #[inline]
    pub fn time(&self) -> FrameTime {
        self.time
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.time.delta
    }

    /// The owning entity. `None` only if it was never added to the map.
    pub fn entity(&self) -> Option<&Entity> {
        self.entities.get(&self.owner)
    }

    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.entities.get_mut(&self.owner)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Deferred structural changes.
    pub fn commands(&mut self) -> &mut Commands {
        self.commands
    }

    /// Queue the owning entity for removal at the end of the frame.
    pub fn despawn_self(&mut self) {
        self.commands.despawn(self.owner);
    }

    /// Emit a signal synchronously. Receivers run before this returns.
    pub fn emit(&mut self, name: &str, payload: &[SignalValue]) -> Result<usize, EngineError> {
        Ok(self.signals.emit_signal(name, payload, self.commands)?)
    }
}
