use crate::entity::EntityMap;
use crate::ids::EntityId;
use crate::math::Vec2;
use crate::world::{ChunkCoord, WorldConfig};
use std::collections::BTreeSet;

/// Point of view used to pick the chunks worth drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    position: Vec2,
    render_distance: i32,
    target: Option<EntityId>,
}

impl Camera2D {
    pub fn new(render_distance: i32) -> Self {
        Self {
            position: Vec2::ZERO,
            render_distance,
            target: None,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn render_distance(&self) -> i32 {
        self.render_distance
    }

    pub fn set_render_distance(&mut self, distance: i32) {
        self.render_distance = distance;
    }

    /// Track an entity's position every frame.
    pub fn follow(&mut self, entity: EntityId) {
        self.target = Some(entity);
    }

    pub fn unfollow(&mut self) {
        self.target = None;
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Copy the followed entity's position, if it still exists.
    pub(crate) fn track(&mut self, entities: &EntityMap) {
        if let Some(entity) = self.target.and_then(|id| entities.get(&id)) {
            self.position = entity.position();
        }
    }

    /// Chunks within `render_distance` of the camera's chunk: offsets
    /// `-d..d` on both axes. Offsets clamp at the edge of the coordinate
    /// range.
    pub fn visible_chunks(&self, config: &WorldConfig) -> BTreeSet<ChunkCoord> {
        let center = config.chunk_of(self.position);
        let d = self.render_distance.max(0);
        (-d..d)
            .flat_map(|dx| {
                (-d..d).map(move |dy| ChunkCoord::new(center.x.saturating_add(dx), center.y.saturating_add(dy)))
            })
            .collect()
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(crate::world::DEFAULT_RENDER_DISTANCE)
    }
}
