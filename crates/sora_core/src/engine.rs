//! Engine context
//!
//! [`Engine`] is the one object game code holds: it owns the id allocator,
//! the component registry, the signal bus and the world, and drives them
//! through the frame loop.

use crate::ecs::{Component, EcsRegistry, TaskAspect};
use crate::entity::Entity;
use crate::error::EngineError;
use crate::ids::{EntityId, IdAllocator};
use crate::interfaces::{InputSource, Renderer};
use crate::physics::{Collider, CollisionMask, Shape};
use crate::signal::{PayloadKind, ReceiverPolicy, Signature, SignalBus, SignalValue, COLLISION, ENTITY_DEATH};
use crate::time::{FrameClock, FrameTime, DEFAULT_FPS};
use crate::world::{World, WorldConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs read once when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub world: WorldConfig,
    /// Frame cap; `0` runs uncapped.
    pub target_fps: u32,
    pub receiver_policy: ReceiverPolicy,
    /// Mask given to colliders built with [`Engine::collider`].
    pub default_mask: CollisionMask,
    /// Step every frame by this many seconds instead of wall-clock time.
    pub fixed_delta: Option<f32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            target_fps: DEFAULT_FPS,
            receiver_policy: ReceiverPolicy::default(),
            default_mask: CollisionMask::ALL,
            fixed_delta: None,
        }
    }
}

/// Cooperative stop flag for [`Engine::run`]. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct Engine {
    options: EngineOptions,
    ids: Arc<IdAllocator>,
    ecs: EcsRegistry,
    signals: SignalBus,
    world: World,
    clock: FrameClock,
    stop: StopHandle,
}

impl Engine {
    /// Build an engine with the built-in task aspect and the `entity_death`
    /// and `collision` signals declared.
    pub fn new(options: EngineOptions) -> Result<Self, EngineError> {
        let ids = Arc::new(IdAllocator::new());

        let mut ecs = EcsRegistry::new(Arc::clone(&ids));
        ecs.register_aspect(Box::new(TaskAspect::default()));

        let mut signals = SignalBus::with_policy(options.receiver_policy);
        signals.register_signal(ENTITY_DEATH, Signature::new([PayloadKind::Entity]))?;
        signals.register_signal(COLLISION, Signature::new([PayloadKind::Entity, PayloadKind::Entity]))?;
        signals.register_receiver(ENTITY_DEATH, |payload, commands| {
            if let Some(id) = payload.first().and_then(SignalValue::as_entity) {
                commands.despawn(id);
            }
            Ok(())
        })?;

        let world = World::new("world", options.world, Arc::clone(&ids))?;
        debug!(?options, "engine created");

        Ok(Self {
            options,
            ids,
            ecs,
            signals,
            world,
            clock: FrameClock::new(options.target_fps),
            stop: StopHandle::default(),
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn ids(&self) -> &Arc<IdAllocator> {
        &self.ids
    }

    pub fn ecs(&self) -> &EcsRegistry {
        &self.ecs
    }

    pub fn ecs_mut(&mut self) -> &mut EcsRegistry {
        &mut self.ecs
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut SignalBus {
        &mut self.signals
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn new_entity(&self, name: impl Into<String>) -> Entity {
        Entity::new(self.ids.next_entity(), name)
    }

    /// Register components on `entity` and add it to the world.
    pub fn spawn(
        &mut self,
        entity: Entity,
        components: Vec<Box<dyn Component>>,
    ) -> Result<EntityId, EngineError> {
        Ok(self.world.spawn(&mut self.ecs, entity, components)?)
    }

    /// Collider using the configured default mask.
    pub fn collider(&self, owner: EntityId, shape: impl Shape + 'static) -> Collider {
        Collider::new(owner, shape).with_mask(self.options.default_mask)
    }

    /// Emit `entity_death` for `entity`. The entity leaves the world at the
    /// end of the next frame.
    pub fn kill(&mut self, entity: EntityId) -> Result<usize, EngineError> {
        Ok(self
            .signals
            .emit_signal(ENTITY_DEATH, &[SignalValue::Entity(entity)], self.world.commands())?)
    }

    /// Run one frame with the given timing.
    pub fn tick(&mut self, time: FrameTime) -> Result<(), EngineError> {
        self.world.update(&mut self.ecs, &mut self.signals, time)
    }

    /// Poll, update, draw, present and pace until the stop handle flips, the
    /// input source asks to quit, or `frame_limit` frames have run.
    ///
    /// Returns the number of frames run.
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
        frame_limit: Option<u64>,
    ) -> Result<u64, EngineError> {
        let mut frames = 0;
        info!(target_fps = self.options.target_fps, ?frame_limit, "run loop started");

        while !self.stop.is_stopped() {
            if frame_limit.is_some_and(|limit| frames >= limit) {
                break;
            }

            input.poll();
            if input.quit_requested() {
                self.stop.stop();
                break;
            }

            let wall = self.clock.begin_frame();
            let time = match self.options.fixed_delta {
                Some(delta) => FrameTime::fixed(delta, wall.frame),
                None => wall,
            };
            self.tick(time)?;

            self.world.draw(renderer);
            renderer.present();
            self.clock.limit();
            frames += 1;
        }

        info!(
            frames,
            elapsed = self.clock.elapsed_secs(),
            entities = self.world.entity_count(),
            "run loop stopped"
        );
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ComponentType, Task};
    use crate::interfaces::{Image, KeyCode, Rgba};
    use crate::math::{Rect, Vec2};
    use crate::physics::Aabb;

    fn options() -> EngineOptions {
        EngineOptions {
            target_fps: 0,
            fixed_delta: Some(0.5),
            ..EngineOptions::default()
        }
    }

    #[derive(Default)]
    struct NullInput {
        polls: u64,
        quit_after: Option<u64>,
    }

    impl InputSource for NullInput {
        fn poll(&mut self) {
            self.polls += 1;
        }

        fn is_pressed(&self, _key: KeyCode) -> bool {
            false
        }

        fn quit_requested(&self) -> bool {
            self.quit_after.is_some_and(|n| self.polls > n)
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        rects: usize,
        presents: usize,
    }

    impl Renderer for CountingRenderer {
        fn draw_rect(&mut self, _rect: Rect, _color: Rgba) {
            self.rects += 1;
        }

        fn draw_image(&mut self, _image: &Image, _position: Vec2) {}

        fn present(&mut self) {
            self.presents += 1;
        }
    }

    #[test]
    fn builtin_signals_and_task_aspect_are_registered() {
        let engine = Engine::new(options()).unwrap();
        assert!(engine.signals().is_declared(ENTITY_DEATH));
        assert!(engine.signals().is_declared(COLLISION));
        assert_eq!(engine.signals().receiver_count(ENTITY_DEATH), 1);
        assert!(engine.ecs().is_claimed(Task::KIND));
    }

    #[test]
    fn entity_death_removes_entity_after_the_frame() {
        let mut engine = Engine::new(options()).unwrap();
        let entity = engine.new_entity("victim");
        let id = engine.spawn(entity, Vec::new()).unwrap();

        assert_eq!(engine.kill(id).unwrap(), 1);
        assert!(engine.world().get_entity(id).is_some());

        engine.tick(FrameTime::fixed(0.5, 0)).unwrap();
        assert!(engine.world().get_entity(id).is_none());
    }

    #[test]
    fn tasks_can_emit_entity_death_mid_frame() {
        let mut engine = Engine::new(options()).unwrap();
        let entity = engine.new_entity("fuse");
        let id = engine
            .spawn(
                entity,
                vec![Box::new(Task::new("fuse", |ctx| {
                    if ctx.time().frame == 2 {
                        let me = ctx.owner();
                        ctx.emit(ENTITY_DEATH, &[SignalValue::Entity(me)])?;
                    }
                    Ok(())
                }))],
            )
            .unwrap();

        for frame in 0..2 {
            engine.tick(FrameTime::fixed(0.5, frame)).unwrap();
        }
        assert!(engine.world().get_entity(id).is_some());
        engine.tick(FrameTime::fixed(0.5, 2)).unwrap();
        assert!(engine.world().get_entity(id).is_none());
    }

    #[test]
    fn run_honours_frame_limit_and_draws_each_frame() {
        let mut engine = Engine::new(options()).unwrap();
        let entity = engine
            .new_entity("box")
            .with_size(Vec2::splat(8.0));
        let id = engine.spawn(entity, Vec::new()).unwrap();
        let collider = engine.collider(id, Aabb::new(8.0, 8.0)).with_velocity(Vec2::new(2.0, 0.0));
        engine.world_mut().add_collider(collider).unwrap();

        let mut input = NullInput::default();
        let mut renderer = CountingRenderer::default();
        let frames = engine.run(&mut input, &mut renderer, Some(4)).unwrap();

        assert_eq!(frames, 4);
        assert_eq!(input.polls, 4);
        assert_eq!(renderer.presents, 4);
        assert_eq!(renderer.rects, 4);
        // fixed 0.5s steps at 2 units/s
        assert_eq!(engine.world().get_entity(id).unwrap().position(), Vec2::new(4.0, 0.0));
    }

    #[test]
    fn stop_handle_ends_the_loop_from_inside_a_task() {
        let mut engine = Engine::new(options()).unwrap();
        let stop = engine.stop_handle();
        let entity = engine.new_entity("director");
        engine
            .spawn(
                entity,
                vec![Box::new(Task::new("stop at 3", move |ctx| {
                    if ctx.time().frame == 2 {
                        stop.stop();
                    }
                    Ok(())
                }))],
            )
            .unwrap();

        let frames = engine
            .run(&mut NullInput::default(), &mut CountingRenderer::default(), Some(100))
            .unwrap();
        assert_eq!(frames, 3);
        assert!(engine.stop_handle().is_stopped());
    }

    #[test]
    fn quit_request_from_input_stops_the_loop() {
        let mut engine = Engine::new(options()).unwrap();
        let mut input = NullInput {
            quit_after: Some(2),
            ..NullInput::default()
        };
        let frames = engine
            .run(&mut input, &mut CountingRenderer::default(), None)
            .unwrap();
        assert_eq!(frames, 2);
    }

    #[test]
    fn default_mask_is_applied_to_colliders() {
        let mut engine = Engine::new(EngineOptions {
            default_mask: CollisionMask::bit(3),
            ..options()
        })
        .unwrap();
        let entity = engine.new_entity("e");
        let id = engine.spawn(entity, Vec::new()).unwrap();
        assert_eq!(engine.collider(id, Aabb::new(1.0, 1.0)).mask, CollisionMask::bit(3));
    }

    #[test]
    fn invalid_world_config_fails_engine_creation() {
        let result = Engine::new(EngineOptions {
            world: WorldConfig {
                chunk_height: -1.0,
                ..WorldConfig::default()
            },
            ..options()
        });
        assert!(matches!(result, Err(EngineError::World(_))));
    }
}
