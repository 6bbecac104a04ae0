//! Sora Engine Runtime
//!
//! Boots the engine headless, spawns a small demo scene and runs it for a
//! bounded number of frames.
//!
//! Usage: `sora [settings.json]`

use anyhow::{Context, Result};
use sora_core::ecs::Task;
use sora_core::interfaces::{Image, Renderer, Rgba};
use sora_core::math::{Rect, Vec2};
use sora_core::physics::Aabb;
use sora_core::signal::{SignalValue, COLLISION, ENTITY_DEATH};
use sora_core::Engine;
use sora_services::{InputState, Settings};

const DEMO_FRAMES: u64 = 180;
const PLAYER_SPEED: f32 = 120.0;

/// Renderer stand-in that only counts and logs what would be drawn.
#[derive(Default)]
struct LogRenderer {
    frame_rects: usize,
    total_rects: usize,
    frames: u64,
}

impl Renderer for LogRenderer {
    fn draw_rect(&mut self, rect: Rect, _color: Rgba) {
        tracing::trace!(min = ?rect.min, size = ?rect.size, "rect");
        self.frame_rects += 1;
    }

    fn draw_image(&mut self, image: &Image, position: Vec2) {
        tracing::trace!(width = image.width, height = image.height, ?position, "image");
    }

    fn present(&mut self) {
        tracing::trace!(frame = self.frames, rects = self.frame_rects, "present");
        self.total_rects += self.frame_rects;
        self.frame_rects = 0;
        self.frames += 1;
    }
}

fn load_settings() -> Result<Settings> {
    match std::env::args().nth(1) {
        Some(path) => Settings::load(&path).with_context(|| format!("loading settings from {path}")),
        None => Ok(Settings::default()),
    }
}

fn build_scene(engine: &mut Engine) -> Result<()> {
    // player: walks right until the wall stops it
    let player = engine
        .new_entity("player")
        .with_size(Vec2::splat(32.0));
    let player = engine.spawn(
        player,
        vec![Box::new(Task::new("player_walk", |ctx| {
            let step = PLAYER_SPEED * ctx.delta();
            if let Some(entity) = ctx.entity_mut() {
                entity.translate(Vec2::new(step, 0.0));
            }
            Ok(())
        }))],
    )?;
    let collider = engine.collider(player, Aabb::new(32.0, 32.0));
    engine.world_mut().add_collider(collider)?;
    engine.world_mut().camera_mut().follow(player);

    let wall = engine
        .new_entity("wall")
        .with_position(Vec2::new(400.0, 0.0))
        .with_size(Vec2::new(32.0, 200.0));
    let wall = engine.spawn(wall, Vec::new())?;
    let collider = engine.collider(wall, Aabb::new(32.0, 200.0)).fixed();
    engine.world_mut().add_collider(collider)?;

    // a head-on pair on a layer above the player
    for (name, x, vx, mass) in [("red", -200.0, 40.0, 1.0), ("blue", -100.0, -40.0, 2.0)] {
        let body = engine
            .new_entity(name)
            .with_position(Vec2::new(x, 300.0))
            .with_zlayer(1)
            .with_size(Vec2::splat(20.0));
        let body = engine.spawn(body, Vec::new())?;
        let collider = engine
            .collider(body, Aabb::new(20.0, 20.0))
            .with_velocity(Vec2::new(vx, 0.0))
            .with_mass(mass);
        engine.world_mut().add_collider(collider)?;
    }

    // debris that burns out after a second
    let debris = engine
        .new_entity("debris")
        .with_position(Vec2::new(-5000.0, -5000.0));
    engine.spawn(
        debris,
        vec![Box::new(Task::new("burn_out", |ctx| {
            if ctx.time().elapsed >= 1.0 {
                let me = ctx.owner();
                ctx.emit(ENTITY_DEATH, &[SignalValue::Entity(me)])?;
            }
            Ok(())
        }))],
    )?;

    engine.signals_mut().register_receiver(COLLISION, |payload, _| {
        if let [SignalValue::Entity(a), SignalValue::Entity(b)] = payload {
            tracing::debug!(%a, %b, "collision");
        }
        Ok(())
    })?;
    engine.signals_mut().register_receiver(ENTITY_DEATH, |payload, _| {
        if let Some(id) = payload.first().and_then(SignalValue::as_entity) {
            tracing::info!(entity = %id, "entity died");
        }
        Ok(())
    })?;

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Sora Engine v{}", sora_core::VERSION);
    let settings = load_settings()?;
    tracing::info!(
        title = %settings.window.title,
        width = settings.window.width,
        height = settings.window.height,
        fps = settings.window.target_fps,
        "settings ready"
    );

    let mut options = settings.engine_options();
    if options.fixed_delta.is_none() && options.target_fps > 0 {
        options.fixed_delta = Some(1.0 / options.target_fps as f32);
    }
    let mut engine = Engine::new(options)?;
    build_scene(&mut engine)?;

    let mut input = InputState::new();
    let mut renderer = LogRenderer::default();
    let frames = engine.run(&mut input, &mut renderer, Some(DEMO_FRAMES))?;

    let world = engine.world();
    if let Some(player) = world.entities().values().find(|e| e.name() == "player") {
        tracing::info!(position = ?player.position(), chunk = %player.chunk(), "player final state");
    }
    tracing::info!(
        frames,
        entities = world.entity_count(),
        layers = world.layer_count(),
        colliders = world.field().len(),
        rects_drawn = renderer.total_rects,
        "demo finished"
    );

    Ok(())
}
