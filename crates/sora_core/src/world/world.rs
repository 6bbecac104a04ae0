use crate::command::{Command, Commands};
use crate::ecs::{Component, EcsRegistry, FrameContext};
use crate::entity::{Entity, EntityMap};
use crate::error::EngineError;
use crate::ids::{ComponentId, EntityId, IdAllocator};
use crate::interfaces::{Renderer, Rgba};
use crate::math::Vec2;
use crate::physics::{Collider, ColliderId, InteractionField};
use crate::signal::{SignalBus, SignalValue, COLLISION};
use crate::time::FrameTime;
use crate::world::{Camera2D, Chunk, ChunkCoord, Layer, WorldConfig, WorldError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

const ENTITY_OUTLINE: Rgba = [255, 0, 255, 255];

/// Owner of every entity, layer and chunk, plus the interaction field.
///
/// A frame runs in fixed stages (see [`World::update`]). Nothing removed
/// during a frame disappears before the flush stage at its end.
pub struct World {
    name: String,
    config: WorldConfig,
    ids: Arc<IdAllocator>,

    layers: BTreeMap<i32, Layer>,
    pending_layers: Vec<i32>,
    entities: EntityMap,
    pending_entities: Vec<EntityId>,

    field: InteractionField,
    camera: Camera2D,
    visible: BTreeSet<ChunkCoord>,
    commands: Commands,
}

fn layer_entry(layers: &mut BTreeMap<i32, Layer>, zlevel: i32, extent: Vec2) -> &mut Layer {
    layers.entry(zlevel).or_insert_with(|| {
        debug!(zlevel, "layer created");
        Layer::new(zlevel, extent)
    })
}

impl World {
    /// Fails when `config` has non-positive or non-finite chunk extents.
    pub fn new(name: impl Into<String>, config: WorldConfig, ids: Arc<IdAllocator>) -> Result<Self, WorldError> {
        config.validate()?;
        let name = name.into();
        debug!(world = %name, ?config, "world created");
        Ok(Self {
            name,
            config,
            field: InteractionField::new(Arc::clone(&ids)),
            ids,
            layers: BTreeMap::new(),
            pending_layers: Vec::new(),
            entities: EntityMap::new(),
            pending_entities: Vec::new(),
            camera: Camera2D::new(config.render_distance),
            visible: BTreeSet::new(),
            commands: Commands::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn ids(&self) -> &Arc<IdAllocator> {
        &self.ids
    }

    /// Fresh, unattached entity with an id from this world's allocator.
    pub fn new_entity(&self, name: impl Into<String>) -> Entity {
        Entity::new(self.ids.next_entity(), name)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn field(&self) -> &InteractionField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut InteractionField {
        &mut self.field
    }

    /// Structural changes to apply at the next flush.
    pub fn commands(&mut self) -> &mut Commands {
        &mut self.commands
    }

    /// Chunks the camera could see at the start of the last update.
    pub fn visible_chunks(&self) -> &BTreeSet<ChunkCoord> {
        &self.visible
    }

    // ── Entities ────────────────────────────────────────────────────

    /// Attach an entity and bucket it by its current position and layer.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if entity.is_attached() || self.entities.contains_key(&id) {
            return Err(WorldError::AlreadyAttached { id });
        }

        entity.attach(&self.config);
        layer_entry(&mut self.layers, entity.zlayer(), self.config.chunk_extent())
            .chunk_mut(entity.chunk())
            .insert(id);
        debug!(entity = %id, name = entity.name(), chunk = %entity.chunk(), zlayer = entity.zlayer(), "entity attached");
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Register `components` on the entity, then attach it.
    pub fn spawn(
        &mut self,
        ecs: &mut EcsRegistry,
        mut entity: Entity,
        components: Vec<Box<dyn Component>>,
    ) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if entity.is_attached() || self.entities.contains_key(&id) {
            return Err(WorldError::AlreadyAttached { id });
        }
        for component in components {
            ecs.register_component(&mut entity, component);
        }
        self.add_entity(entity)
    }

    /// Queue an entity for removal at the next flush. Returns `false` when
    /// the entity isn't in this world.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        if !self.pending_entities.contains(&id) {
            self.pending_entities.push(id);
        }
        true
    }

    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.pending_entities.contains(&id)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn attach_component(
        &mut self,
        ecs: &mut EcsRegistry,
        entity: EntityId,
        component: Box<dyn Component>,
    ) -> Result<ComponentId, WorldError> {
        let target = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound { id: entity })?;
        Ok(ecs.register_component(target, component))
    }

    pub fn detach_component(
        &mut self,
        ecs: &mut EcsRegistry,
        entity: EntityId,
        component: ComponentId,
    ) -> Result<Option<Box<dyn Component>>, WorldError> {
        let target = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound { id: entity })?;
        Ok(ecs.unregister_component(target, component))
    }

    /// Chunk the entity is currently resident in.
    pub fn resident_chunk(&self, id: EntityId) -> Option<&Chunk> {
        let entity = self.entities.get(&id)?;
        self.get_chunk(entity.prev_chunk(), entity.prev_zlayer())
            .filter(|chunk| chunk.contains(id))
    }

    // ── Layers and chunks ───────────────────────────────────────────

    /// Ensure a layer exists at `zlevel`.
    pub fn add_layer(&mut self, zlevel: i32) -> &mut Layer {
        self.layer_mut(zlevel)
    }

    /// Queue a layer for removal. Its resident entities are purged with it.
    pub fn remove_layer(&mut self, zlevel: i32) {
        if !self.pending_layers.contains(&zlevel) {
            self.pending_layers.push(zlevel);
        }
    }

    pub fn get_layer(&self, zlevel: i32) -> Option<&Layer> {
        self.layers.get(&zlevel)
    }

    /// Layer at `zlevel`, created empty if missing.
    pub fn layer_mut(&mut self, zlevel: i32) -> &mut Layer {
        layer_entry(&mut self.layers, zlevel, self.config.chunk_extent())
    }

    /// Layers in ascending z order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn get_chunk(&self, coord: ChunkCoord, zlevel: i32) -> Option<&Chunk> {
        self.layers.get(&zlevel)?.chunk(coord)
    }

    /// Chunk at `coord` on `zlevel`, creating the layer and chunk if needed.
    pub fn chunk_mut(&mut self, coord: ChunkCoord, zlevel: i32) -> &mut Chunk {
        self.layer_mut(zlevel).chunk_mut(coord)
    }

    /// Queue a chunk for removal. Its resident entities are purged with it.
    pub fn remove_chunk(&mut self, coord: ChunkCoord, zlevel: i32) {
        if let Some(layer) = self.layers.get_mut(&zlevel) {
            layer.remove_chunk(coord);
        }
    }

    // ── Physics ─────────────────────────────────────────────────────

    pub fn add_collider(&mut self, collider: Collider) -> Result<ColliderId, EngineError> {
        let owner = collider.owner();
        if !self.entities.contains_key(&owner) {
            return Err(WorldError::EntityNotFound { id: owner }.into());
        }
        Ok(self.field.add_collider(collider)?)
    }

    // ── Frame ───────────────────────────────────────────────────────

    /// Run one frame:
    ///
    /// 1. refresh the camera's visible chunk set
    /// 2. per-entity component updates, layers by ascending z, then chunks
    /// 3. aspect updates
    /// 4. physics step, emitting `collision` for every contact if declared
    /// 5. chunk migration
    /// 6. flush queued commands and removals
    pub fn update(
        &mut self,
        ecs: &mut EcsRegistry,
        signals: &mut SignalBus,
        time: FrameTime,
    ) -> Result<(), EngineError> {
        self.camera.track(&self.entities);
        self.visible = self.camera.visible_chunks(&self.config);

        let sweep: Vec<EntityId> = self
            .layers
            .values()
            .flat_map(|layer| layer.chunks())
            .flat_map(|chunk| chunk.entities())
            .collect();

        let mut frame = FrameContext::new(&mut self.entities, signals, &mut self.commands, time);
        for id in sweep {
            if frame.entities.contains_key(&id) {
                ecs.handle_components(id, &mut frame)?;
            }
        }
        ecs.update(&mut frame)?;

        let manifolds = self.field.step(&mut self.entities, time.delta)?;
        if signals.is_declared(COLLISION) {
            for manifold in &manifolds {
                let payload = [
                    SignalValue::Entity(manifold.owner_a),
                    SignalValue::Entity(manifold.owner_b),
                ];
                signals.emit_signal(COLLISION, &payload, &mut self.commands)?;
            }
        }

        let moved = self.migrate_entities();
        let purged = self.flush(ecs);
        trace!(
            world = %self.name,
            frame = time.frame,
            contacts = manifolds.len(),
            moved,
            purged,
            "world updated"
        );
        Ok(())
    }

    /// Re-home every entity whose chunk or layer changed since the last
    /// pass, then commit current spatial values as previous. Returns how many
    /// entities changed bucket.
    pub fn migrate_entities(&mut self) -> usize {
        let extent = self.config.chunk_extent();
        let mut moved = 0;
        for entity in self.entities.values_mut() {
            if entity.refresh_chunk(&self.config) {
                let id = entity.id();
                if let Some(old) = self
                    .layers
                    .get_mut(&entity.prev_zlayer())
                    .and_then(|layer| layer.existing_chunk_mut(entity.prev_chunk()))
                {
                    old.remove(id);
                }
                layer_entry(&mut self.layers, entity.zlayer(), extent)
                    .chunk_mut(entity.chunk())
                    .insert(id);
                trace!(entity = %id, from = %entity.prev_chunk(), to = %entity.chunk(), zlayer = entity.zlayer(), "entity migrated");
                moved += 1;
            }
            entity.commit_migration();
        }
        moved
    }

    /// Apply queued commands, then queued layer, chunk and entity removals.
    /// Returns how many entities were purged.
    pub fn flush(&mut self, ecs: &mut EcsRegistry) -> usize {
        let commands: Vec<Command> = self.commands.drain().collect();
        for command in commands {
            self.apply(ecs, command);
        }

        let mut doomed: Vec<EntityId> = Vec::new();
        for zlevel in std::mem::take(&mut self.pending_layers) {
            if let Some(layer) = self.layers.remove(&zlevel) {
                debug!(zlevel, residents = layer.resident_count(), "layer removed");
                doomed.extend(layer.chunks().flat_map(|chunk| chunk.entities()));
            }
        }
        for layer in self.layers.values_mut() {
            for chunk in layer.take_removed_chunks() {
                debug!(chunk = %chunk.coord(), zlevel = layer.zlevel(), residents = chunk.len(), "chunk removed");
                doomed.extend(chunk.entities());
            }
        }
        doomed.append(&mut self.pending_entities);

        doomed
            .into_iter()
            .filter(|&id| self.purge_entity(ecs, id))
            .count()
    }

    fn apply(&mut self, ecs: &mut EcsRegistry, command: Command) {
        match command {
            Command::Spawn { entity, components } => {
                if let Err(err) = self.spawn(ecs, entity, components) {
                    warn!(%err, "spawn dropped");
                }
            }
            Command::Despawn(id) => {
                if !self.remove_entity(id) {
                    debug!(entity = %id, "despawn of unknown entity ignored");
                }
            }
            Command::Attach { entity, component } => {
                if let Err(err) = self.attach_component(ecs, entity, component) {
                    warn!(%err, "attach dropped");
                }
            }
            Command::Detach { entity, component } => match self.detach_component(ecs, entity, component) {
                Ok(Some(_)) => {}
                Ok(None) => debug!(entity = %entity, component = %component, "detach of unknown component ignored"),
                Err(err) => warn!(%err, "detach dropped"),
            },
        }
    }

    /// Remove an entity right away: components, colliders, chunk residency.
    fn purge_entity(&mut self, ecs: &mut EcsRegistry, id: EntityId) -> bool {
        let Some(mut entity) = self.entities.remove(&id) else {
            return false;
        };
        let components = ecs.unregister_entity(&mut entity);
        let colliders = self.field.remove_colliders_of(id);
        if let Some(chunk) = self
            .layers
            .get_mut(&entity.prev_zlayer())
            .and_then(|layer| layer.existing_chunk_mut(entity.prev_chunk()))
        {
            chunk.remove(id);
        }
        entity.detach();
        debug!(entity = %id, name = entity.name(), components, colliders, "entity purged");
        true
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Draw entity bounds back-to-front, visible chunks only. Returns how
    /// many entities were drawn.
    pub fn draw(&self, renderer: &mut dyn Renderer) -> usize {
        let mut drawn = 0;
        for layer in self.layers.values() {
            for chunk in layer.chunks().filter(|chunk| self.visible.contains(&chunk.coord())) {
                for id in chunk.entities() {
                    if let Some(entity) = self.entities.get(&id) {
                        renderer.draw_rect(entity.rect(), ENTITY_OUTLINE);
                        drawn += 1;
                    }
                }
            }
        }
        drawn
    }
}
