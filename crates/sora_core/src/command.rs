//! Deferred structural changes.
//!
//! Code running inside a frame (component hooks, aspects, signal receivers)
//! never mutates the containers being iterated. It records what it wants here
//! and the world applies the batch in its flush phase, in recording order.

use crate::ecs::Component;
use crate::entity::Entity;
use crate::ids::{ComponentId, EntityId};
use std::fmt;

pub enum Command {
    /// Add an entity, then attach its components.
    Spawn {
        entity: Entity,
        components: Vec<Box<dyn Component>>,
    },
    /// Queue an entity for removal.
    Despawn(EntityId),
    Attach {
        entity: EntityId,
        component: Box<dyn Component>,
    },
    Detach {
        entity: EntityId,
        component: ComponentId,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Spawn { entity, components } => f
                .debug_struct("Spawn")
                .field("entity", &entity.id())
                .field("components", &components.len())
                .finish(),
            Command::Despawn(id) => f.debug_tuple("Despawn").field(id).finish(),
            Command::Attach { entity, component } => f
                .debug_struct("Attach")
                .field("entity", entity)
                .field("kind", &component.kind())
                .finish(),
            Command::Detach { entity, component } => f
                .debug_struct("Detach")
                .field("entity", entity)
                .field("component", component)
                .finish(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) {
        self.spawn_with(entity, Vec::new());
    }

    pub fn spawn_with(&mut self, entity: Entity, components: Vec<Box<dyn Component>>) {
        self.queue.push(Command::Spawn { entity, components });
    }

    pub fn despawn(&mut self, entity: EntityId) {
        self.queue.push(Command::Despawn(entity));
    }

    pub fn attach(&mut self, entity: EntityId, component: Box<dyn Component>) {
        self.queue.push(Command::Attach { entity, component });
    }

    pub fn detach(&mut self, entity: EntityId, component: ComponentId) {
        self.queue.push(Command::Detach { entity, component });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every queued command, leaving the buffer empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.queue.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut commands = Commands::new();
        commands.despawn(EntityId::from_raw(2));
        commands.spawn(Entity::new(EntityId::from_raw(3), "late"));
        commands.detach(EntityId::from_raw(3), ComponentId::from_raw(9));
        assert_eq!(commands.len(), 3);

        let drained: Vec<String> = commands.drain().map(|c| format!("{c:?}")).collect();
        assert!(drained[0].starts_with("Despawn"));
        assert!(drained[1].starts_with("Spawn"));
        assert!(drained[2].starts_with("Detach"));
        assert!(commands.is_empty());
    }
}
