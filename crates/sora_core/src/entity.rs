//! Entities
//!
//! An entity is an identity plus the spatial attributes the world buckets it
//! by. Behaviour lives in components owned by the [`EcsRegistry`]; the entity
//! only records which component ids are attached and of which kind.
//!
//! Spatial state is tracked twice: the *current* values game logic mutates
//! freely during a frame, and the *previous* values committed by the world's
//! migration pass. The two only diverge mid-frame.
//!
//! [`EcsRegistry`]: crate::ecs::EcsRegistry

use crate::ecs::ComponentKind;
use crate::ids::{ComponentId, EntityId};
use crate::math::{Rect, Vec2};
use crate::world::{ChunkCoord, WorldConfig};
use std::collections::BTreeMap;

/// Entities owned by a world, keyed by id (iteration order = creation order).
pub type EntityMap = BTreeMap<EntityId, Entity>;

#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    name: String,

    position: Vec2,
    prev_position: Vec2,
    chunk: ChunkCoord,
    prev_chunk: ChunkCoord,
    zlayer: i32,
    prev_zlayer: i32,

    size: Vec2,
    components: BTreeMap<ComponentId, ComponentKind>,
    attached: bool,
}

impl Entity {
    /// Create an unattached entity at the origin on layer 0.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vec2::ZERO,
            prev_position: Vec2::ZERO,
            chunk: ChunkCoord::default(),
            prev_chunk: ChunkCoord::default(),
            zlayer: 0,
            prev_zlayer: 0,
            size: Vec2::ZERO,
            components: BTreeMap::new(),
            attached: false,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_zlayer(mut self, zlayer: i32) -> Self {
        self.zlayer = zlayer;
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
    }

    /// Position committed by the last migration pass.
    #[inline]
    pub fn prev_position(&self) -> Vec2 {
        self.prev_position
    }

    #[inline]
    pub fn zlayer(&self) -> i32 {
        self.zlayer
    }

    /// Move the entity to another layer. Takes effect at the next migration pass.
    pub fn set_zlayer(&mut self, zlayer: i32) {
        self.zlayer = zlayer;
    }

    #[inline]
    pub fn prev_zlayer(&self) -> i32 {
        self.prev_zlayer
    }

    /// Chunk the entity was last bucketed into.
    #[inline]
    pub fn chunk(&self) -> ChunkCoord {
        self.chunk
    }

    #[inline]
    pub fn prev_chunk(&self) -> ChunkCoord {
        self.prev_chunk
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Bounds centred on the current position.
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    /// Whether the entity currently belongs to a world.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    // ── Components ──────────────────────────────────────────────────

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, ComponentKind)> + '_ {
        self.components.iter().map(|(&id, &kind)| (id, kind))
    }

    /// Ids of attached components of the given kind, in registration order.
    pub fn components_of(&self, kind: ComponentKind) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, &k)| k == kind)
            .map(|(&id, _)| id)
            .collect()
    }

    /// First attached component of `kind`, if any.
    pub fn component_of(&self, kind: ComponentKind) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|(_, &k)| k == kind)
            .map(|(&id, _)| id)
    }

    pub fn has_component(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn link_component(&mut self, id: ComponentId, kind: ComponentKind) {
        self.components.insert(id, kind);
    }

    pub(crate) fn unlink_component(&mut self, id: ComponentId) -> Option<ComponentKind> {
        self.components.remove(&id)
    }

    // ── World bookkeeping ───────────────────────────────────────────

    /// Bucket the current position and commit everything as "previous".
    /// Used once when the entity enters a world.
    pub(crate) fn attach(&mut self, config: &WorldConfig) {
        self.chunk = config.chunk_of(self.position);
        self.prev_chunk = self.chunk;
        self.prev_zlayer = self.zlayer;
        self.prev_position = self.position;
        self.attached = true;
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    /// Recompute the chunk from the current position. Returns `true` when
    /// the chunk or the layer differs from the committed values.
    pub(crate) fn refresh_chunk(&mut self, config: &WorldConfig) -> bool {
        self.chunk = config.chunk_of(self.position);
        self.chunk != self.prev_chunk || self.zlayer != self.prev_zlayer
    }

    pub(crate) fn commit_migration(&mut self) {
        self.prev_chunk = self.chunk;
        self.prev_zlayer = self.zlayer;
        self.prev_position = self.position;
    }
}
