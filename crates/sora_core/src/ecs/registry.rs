// registry.rs - Component storage and aspect scheduling
//
// The registry owns every component instance, bucketed by kind, and the
// priority-ordered list of aspects that drive them each frame.

use crate::ecs::{Aspect, Component, ComponentKind, ComponentType, EcsError, FrameContext};
use crate::entity::Entity;
use crate::error::EngineError;
use crate::ids::{AspectId, ComponentId, EntityId, IdAllocator};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace, warn};

type Bucket = BTreeMap<ComponentId, Box<dyn Component>>;

struct RegisteredAspect {
    id: AspectId,
    priority: i32,
    targets: Vec<ComponentKind>,
    aspect: Box<dyn Aspect>,
}

#[derive(Clone, Copy)]
struct Owner {
    kind: ComponentKind,
    entity: EntityId,
}

pub struct EcsRegistry {
    ids: Arc<IdAllocator>,
    aspects: Vec<RegisteredAspect>,
    storage: HashMap<ComponentKind, Bucket>,
    owners: HashMap<ComponentId, Owner>,
    /// Number of aspects targeting each kind.
    claimed: HashMap<ComponentKind, usize>,
}

impl EcsRegistry {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            ids,
            aspects: Vec::new(),
            storage: HashMap::new(),
            owners: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    pub fn ids(&self) -> &Arc<IdAllocator> {
        &self.ids
    }

    // ── Aspects ─────────────────────────────────────────────────────

    /// Register an aspect and make sure its target kinds have storage.
    ///
    /// Aspects run in descending priority; equal priorities keep insertion order.
    pub fn register_aspect(&mut self, aspect: Box<dyn Aspect>) -> AspectId {
        let id = self.ids.next_aspect();
        let targets = aspect.targets().to_vec();
        let priority = aspect.priority();

        for &kind in &targets {
            self.storage.entry(kind).or_default();
            *self.claimed.entry(kind).or_insert(0) += 1;
        }

        debug!(aspect = %id, name = aspect.name(), priority, "registered aspect");
        self.aspects.push(RegisteredAspect {
            id,
            priority,
            targets,
            aspect,
        });
        // stable: ties keep registration order
        self.aspects.sort_by_key(|slot| Reverse(slot.priority));
        id
    }

    pub fn unregister_aspect(&mut self, id: AspectId) -> Option<Box<dyn Aspect>> {
        let index = self.aspects.iter().position(|slot| slot.id == id)?;
        let slot = self.aspects.remove(index);
        for kind in &slot.targets {
            if let Some(count) = self.claimed.get_mut(kind) {
                *count -= 1;
                if *count == 0 {
                    self.claimed.remove(kind);
                }
            }
        }
        Some(slot.aspect)
    }

    /// Aspect ids in run order.
    pub fn aspect_order(&self) -> Vec<AspectId> {
        self.aspects.iter().map(|slot| slot.id).collect()
    }

    /// Aspect priorities in run order.
    pub fn aspect_priorities(&self) -> Vec<i32> {
        self.aspects.iter().map(|slot| slot.priority).collect()
    }

    /// Whether any registered aspect drives `kind`.
    pub fn is_claimed(&self, kind: ComponentKind) -> bool {
        self.claimed.contains_key(&kind)
    }

    // ── Components ──────────────────────────────────────────────────

    /// Attach a component to `entity` under a freshly minted id.
    pub fn register_component(
        &mut self,
        entity: &mut Entity,
        component: Box<dyn Component>,
    ) -> ComponentId {
        let id = self.ids.next_component();
        self.insert(entity, id, component);
        id
    }

    /// Attach a component under a caller-chosen id.
    ///
    /// Registering an id that is already present under the same kind is a
    /// no-op and the duplicate instance is dropped.
    pub fn register_component_with_id(
        &mut self,
        entity: &mut Entity,
        id: ComponentId,
        component: Box<dyn Component>,
    ) -> Result<ComponentId, EcsError> {
        let kind = component.kind();
        if let Some(owner) = self.owners.get(&id) {
            if owner.kind != kind {
                return Err(EcsError::KindMismatch {
                    id,
                    requested: kind,
                    actual: owner.kind,
                });
            }
            debug!(component = %id, %kind, "component already registered");
            return Ok(id);
        }
        self.ids.reserve_component(id);
        self.insert(entity, id, component);
        Ok(id)
    }

    fn insert(&mut self, entity: &mut Entity, id: ComponentId, mut component: Box<dyn Component>) {
        let kind = component.kind();
        entity.link_component(id, kind);
        component.on_attach(entity);

        self.owners.insert(
            id,
            Owner {
                kind,
                entity: entity.id(),
            },
        );
        self.storage.entry(kind).or_default().insert(id, component);
        trace!(component = %id, %kind, entity = %entity.id(), "registered component");
    }

    /// Detach a component from its entity and drop it from storage.
    ///
    /// Returns `None` without side effects when the component is unknown or
    /// belongs to a different entity.
    pub fn unregister_component(
        &mut self,
        entity: &mut Entity,
        id: ComponentId,
    ) -> Option<Box<dyn Component>> {
        let owner = *self.owners.get(&id)?;
        if owner.entity != entity.id() {
            warn!(component = %id, owner = %owner.entity, entity = %entity.id(), "component owned by another entity");
            return None;
        }
        let bucket = self.storage.get_mut(&owner.kind)?;
        let component = bucket.remove(&id)?;
        self.owners.remove(&id);
        entity.unlink_component(id);
        Some(component)
    }

    /// Drop every component attached to `entity`. Returns how many were removed.
    pub fn unregister_entity(&mut self, entity: &mut Entity) -> usize {
        let ids: Vec<ComponentId> = entity.components().map(|(id, _)| id).collect();
        ids.into_iter()
            .filter(|&id| self.unregister_component(entity, id).is_some())
            .count()
    }

    pub fn owner_of(&self, id: ComponentId) -> Option<EntityId> {
        self.owners.get(&id).map(|owner| owner.entity)
    }

    fn bucket(&self, kind: ComponentKind) -> Result<&Bucket, EcsError> {
        self.storage
            .get(&kind)
            .ok_or(EcsError::UnknownComponentType { kind })
    }

    fn bucket_mut(&mut self, kind: ComponentKind) -> Result<&mut Bucket, EcsError> {
        self.storage
            .get_mut(&kind)
            .ok_or(EcsError::UnknownComponentType { kind })
    }

    /// All components of a kind, in registration order.
    pub fn components(
        &self,
        kind: ComponentKind,
    ) -> Result<impl Iterator<Item = (ComponentId, &dyn Component)>, EcsError> {
        Ok(self
            .bucket(kind)?
            .iter()
            .map(|(&id, component)| (id, &**component)))
    }

    pub fn component_count(&self, kind: ComponentKind) -> Result<usize, EcsError> {
        Ok(self.bucket(kind)?.len())
    }

    pub fn component(&self, kind: ComponentKind, id: ComponentId) -> Result<&dyn Component, EcsError> {
        self.bucket(kind)?
            .get(&id)
            .map(|component| &**component)
            .ok_or(EcsError::UnknownComponent { kind, id })
    }

    pub fn component_mut(
        &mut self,
        kind: ComponentKind,
        id: ComponentId,
    ) -> Result<&mut dyn Component, EcsError> {
        match self.bucket_mut(kind)?.get_mut(&id) {
            Some(component) => Ok(&mut **component),
            None => Err(EcsError::UnknownComponent { kind, id }),
        }
    }

    pub fn component_as<T: ComponentType>(&self, id: ComponentId) -> Result<&T, EcsError> {
        let component = self.component(T::KIND, id)?;
        let actual = component.kind();
        component.downcast_ref::<T>().ok_or(EcsError::KindMismatch {
            id,
            requested: T::KIND,
            actual,
        })
    }

    pub fn component_as_mut<T: ComponentType>(&mut self, id: ComponentId) -> Result<&mut T, EcsError> {
        let component = self.component_mut(T::KIND, id)?;
        let actual = component.kind();
        component.downcast_mut::<T>().ok_or(EcsError::KindMismatch {
            id,
            requested: T::KIND,
            actual,
        })
    }

    // ── Frame ───────────────────────────────────────────────────────

    /// Run every aspect over its target kinds.
    ///
    /// Each bucket's ids are snapshotted before hooks run; structural changes
    /// requested by hooks arrive through the frame's command buffer.
    pub fn update(&mut self, frame: &mut FrameContext<'_>) -> Result<(), EngineError> {
        for slot in &mut self.aspects {
            let RegisteredAspect {
                aspect, targets, ..
            } = slot;
            for &kind in targets.iter() {
                let Some(bucket) = self.storage.get_mut(&kind) else {
                    continue;
                };
                let ids: Vec<ComponentId> = bucket.keys().copied().collect();
                trace!(aspect = aspect.name(), %kind, count = ids.len(), "aspect pass");
                for id in ids {
                    let (Some(component), Some(owner)) = (bucket.get_mut(&id), self.owners.get(&id))
                    else {
                        continue;
                    };
                    let mut ctx = frame.tick(owner.entity, id);
                    aspect.handle(&mut **component, &mut ctx)?;
                }
            }
        }
        Ok(())
    }

    /// Run the `update` hook of every component on `entity` that no aspect
    /// drives.
    pub fn handle_components(
        &mut self,
        entity: EntityId,
        frame: &mut FrameContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(target) = frame.entities.get(&entity) else {
            return Err(EcsError::UnknownEntity { id: entity }.into());
        };
        let attached: Vec<(ComponentId, ComponentKind)> = target
            .components()
            .filter(|(_, kind)| !self.claimed.contains_key(kind))
            .collect();

        for (id, kind) in attached {
            let Some(component) = self.storage.get_mut(&kind).and_then(|b| b.get_mut(&id)) else {
                continue;
            };
            let mut ctx = frame.tick(entity, id);
            component.update(&mut ctx)?;
        }
        Ok(())
    }
}

impl Default for EcsRegistry {
    fn default() -> Self {
        Self::new(Arc::new(IdAllocator::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Commands;
    use crate::define_component;
    use crate::ecs::{TickContext, UpdateAspect};
    use crate::entity::EntityMap;
    use crate::math::Vec2;
    use crate::signal::SignalBus;
    use crate::time::FrameTime;
    use std::sync::Mutex;

    static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct Velocity(Vec2);
    define_component!(Velocity, "Velocity");
    impl Component for Velocity {
        fn kind(&self) -> ComponentKind {
            Self::KIND
        }

        fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            let step = self.0 * ctx.delta();
            if let Some(e) = ctx.entity_mut() {
                e.translate(step);
            }
            Ok(())
        }
    }

    struct Sprite;
    define_component!(Sprite, "Sprite");
    impl Component for Sprite {
        fn kind(&self) -> ComponentKind {
            Self::KIND
        }
    }

    /// Resolves its sibling sprite on attach.
    #[derive(Default)]
    struct SpriteRenderer {
        target: Option<ComponentId>,
    }
    define_component!(SpriteRenderer, "SpriteRenderer");
    impl Component for SpriteRenderer {
        fn kind(&self) -> ComponentKind {
            Self::KIND
        }

        fn on_attach(&mut self, entity: &Entity) {
            self.target = entity.component_of(Sprite::KIND);
        }
    }

    struct Despawner;
    define_component!(Despawner, "Despawner");
    impl Component for Despawner {
        fn kind(&self) -> ComponentKind {
            Self::KIND
        }

        fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            ctx.despawn_self();
            Ok(())
        }
    }

    struct Recorder {
        name: &'static str,
        priority: i32,
        targets: Vec<ComponentKind>,
    }

    impl Aspect for Recorder {
        fn name(&self) -> &str {
            self.name
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
            _ctx: &mut TickContext<'_>,
        ) -> Result<(), EngineError> {
            LOG.lock()
                .unwrap()
                .push(format!("{}:{}", self.name, component.kind()));
            Ok(())
        }
    }

    fn entity(registry: &EcsRegistry, name: &str) -> Entity {
        Entity::new(registry.ids().next_entity(), name)
    }

    #[test]
    fn aspects_run_in_descending_priority() {
        let mut registry = EcsRegistry::default();
        for priority in [1, 5, 3] {
            registry.register_aspect(Box::new(UpdateAspect::new("a", [Velocity::KIND]).with_priority(priority)));
        }
        assert_eq!(registry.aspect_priorities(), vec![5, 3, 1]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut registry = EcsRegistry::default();
        let first = registry.register_aspect(Box::new(UpdateAspect::new("first", [Sprite::KIND])));
        let high = registry.register_aspect(Box::new(UpdateAspect::new("high", [Sprite::KIND]).with_priority(2)));
        let second = registry.register_aspect(Box::new(UpdateAspect::new("second", [Sprite::KIND])));
        assert_eq!(registry.aspect_order(), vec![high, first, second]);
    }

    #[test]
    fn unregistering_an_aspect_releases_its_claims() {
        let mut registry = EcsRegistry::default();
        let motion = registry.register_aspect(Box::new(UpdateAspect::new("motion", [Velocity::KIND])));
        let extra = registry.register_aspect(Box::new(UpdateAspect::new("extra", [Velocity::KIND])));

        let removed = registry.unregister_aspect(motion).unwrap();
        assert_eq!(removed.name(), "motion");
        assert_eq!(registry.aspect_order(), vec![extra]);
        assert!(registry.is_claimed(Velocity::KIND));

        registry.unregister_aspect(extra).unwrap();
        assert!(!registry.is_claimed(Velocity::KIND));
        assert!(registry.unregister_aspect(extra).is_none());
    }

    #[test]
    fn aspect_registration_creates_buckets() {
        let mut registry = EcsRegistry::default();
        assert!(matches!(
            registry.component_count(Velocity::KIND),
            Err(EcsError::UnknownComponentType { .. })
        ));
        registry.register_aspect(Box::new(UpdateAspect::new("motion", [Velocity::KIND])));
        assert_eq!(registry.component_count(Velocity::KIND).unwrap(), 0);
    }

    #[test]
    fn registration_links_entity_and_component() {
        let mut registry = EcsRegistry::default();
        let mut e = entity(&registry, "e");
        let sprite = registry.register_component(&mut e, Box::new(Sprite));
        let renderer = registry.register_component(&mut e, Box::new(SpriteRenderer::default()));

        assert!(e.has_component(sprite));
        assert_eq!(registry.owner_of(renderer), Some(e.id()));
        let r = registry.component_as::<SpriteRenderer>(renderer).unwrap();
        assert_eq!(r.target, Some(sprite));
    }

    #[test]
    fn re_registering_same_id_is_a_no_op() {
        let mut registry = EcsRegistry::default();
        let mut e = entity(&registry, "e");
        let id = ComponentId::from_raw(500);
        registry.register_component_with_id(&mut e, id, Box::new(Sprite)).unwrap();
        registry.register_component_with_id(&mut e, id, Box::new(Sprite)).unwrap();
        assert_eq!(registry.component_count(Sprite::KIND).unwrap(), 1);
        assert_eq!(e.component_count(), 1);

        let clash = registry.register_component_with_id(&mut e, id, Box::new(Despawner));
        assert!(matches!(clash, Err(EcsError::KindMismatch { .. })));

        let fresh = registry.register_component(&mut e, Box::new(Sprite));
        assert!(fresh.raw() > 500);
    }

    #[test]
    fn unregister_removes_from_entity_and_storage() {
        let mut registry = EcsRegistry::default();
        let mut e = entity(&registry, "e");
        let id = registry.register_component(&mut e, Box::new(Sprite));

        assert!(registry.unregister_component(&mut e, id).is_some());
        assert!(!e.has_component(id));
        assert_eq!(registry.component_count(Sprite::KIND).unwrap(), 0);
        assert!(registry.unregister_component(&mut e, id).is_none());
    }

    #[test]
    fn unregister_unknown_component_is_a_no_op() {
        let mut registry = EcsRegistry::default();
        let mut e = entity(&registry, "e");
        assert!(registry
            .unregister_component(&mut e, ComponentId::from_raw(77))
            .is_none());
    }

    #[test]
    fn unknown_kind_lookup_fails() {
        let registry = EcsRegistry::default();
        let err = registry
            .component(Sprite::KIND, ComponentId::from_raw(1))
            .err()
            .map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("component type 'Sprite' has no registered storage")
        );
        assert!(registry.components(Velocity::KIND).is_err());
    }

    #[test]
    fn update_drives_claimed_components() {
        let mut registry = EcsRegistry::default();
        registry.register_aspect(Box::new(UpdateAspect::new("motion", [Velocity::KIND])));

        let mut entities = EntityMap::new();
        let mut e = entity(&registry, "mover");
        registry.register_component(&mut e, Box::new(Velocity(Vec2::new(10.0, 0.0))));
        let id = e.id();
        entities.insert(id, e);

        let mut signals = SignalBus::new();
        let mut commands = Commands::new();
        let mut frame = FrameContext::new(&mut entities, &mut signals, &mut commands, FrameTime::fixed(0.5, 0));
        registry.update(&mut frame).unwrap();

        assert_eq!(entities[&id].position(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn multi_target_aspect_finishes_one_kind_before_the_next() {
        let mut registry = EcsRegistry::default();
        registry.register_aspect(Box::new(Recorder {
            name: "rec",
            priority: 0,
            targets: vec![Sprite::KIND, Velocity::KIND],
        }));

        let mut entities = EntityMap::new();
        for _ in 0..2 {
            let mut e = entity(&registry, "e");
            registry.register_component(&mut e, Box::new(Velocity(Vec2::ZERO)));
            registry.register_component(&mut e, Box::new(Sprite));
            entities.insert(e.id(), e);
        }

        LOG.lock().unwrap().clear();
        let mut signals = SignalBus::new();
        let mut commands = Commands::new();
        let mut frame = FrameContext::new(&mut entities, &mut signals, &mut commands, FrameTime::default());
        registry.update(&mut frame).unwrap();

        let log = LOG.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["rec:Sprite", "rec:Sprite", "rec:Velocity", "rec:Velocity"]
        );
    }

    #[test]
    fn despawn_during_sweep_is_deferred() {
        let mut registry = EcsRegistry::default();
        registry.register_aspect(Box::new(UpdateAspect::new("reaper", [Despawner::KIND])));

        let mut entities = EntityMap::new();
        let mut e = entity(&registry, "doomed");
        registry.register_component(&mut e, Box::new(Despawner));
        let id = e.id();
        entities.insert(id, e);

        let mut signals = SignalBus::new();
        let mut commands = Commands::new();
        let mut frame = FrameContext::new(&mut entities, &mut signals, &mut commands, FrameTime::default());
        registry.update(&mut frame).unwrap();

        assert!(entities.contains_key(&id));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn handle_components_skips_aspect_driven_kinds() {
        let mut registry = EcsRegistry::default();
        let mut entities = EntityMap::new();
        let mut e = entity(&registry, "e");
        registry.register_component(&mut e, Box::new(Velocity(Vec2::new(2.0, 0.0))));
        let id = e.id();
        entities.insert(id, e);

        let mut signals = SignalBus::new();
        let mut commands = Commands::new();
        {
            let mut frame =
                FrameContext::new(&mut entities, &mut signals, &mut commands, FrameTime::fixed(1.0, 0));
            registry.handle_components(id, &mut frame).unwrap();
        }
        assert_eq!(entities[&id].position(), Vec2::new(2.0, 0.0));

        registry.register_aspect(Box::new(UpdateAspect::new("motion", [Velocity::KIND])));
        {
            let mut frame =
                FrameContext::new(&mut entities, &mut signals, &mut commands, FrameTime::fixed(1.0, 1));
            registry.handle_components(id, &mut frame).unwrap();
        }
        assert_eq!(entities[&id].position(), Vec2::new(2.0, 0.0));
    }
}
