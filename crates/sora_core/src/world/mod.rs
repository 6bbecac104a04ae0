//! Spatial world model
//!
//! Entities are bucketed twice: by z-layer, then by the chunk their position
//! falls in. Layers and chunks are created lazily on first access and are
//! never pruned automatically, so the structure grows with exploration.
//! Removals requested during a frame are queued and applied in the world's
//! flush phase.

mod camera;
mod chunk;
mod layer;
#[allow(clippy::module_inception)]
mod world;

pub use camera::Camera2D;
pub use chunk::{Chunk, ChunkCoord};
pub use layer::Layer;
pub use world::World;

use crate::ids::EntityId;
use crate::math::{floor_div, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chunk extent in pixels.
pub const DEFAULT_CHUNK_SIZE: f32 = 4096.0;
/// Default camera render distance, in chunks.
pub const DEFAULT_RENDER_DISTANCE: i32 = 4;

/// Engine-wide spatial constants, read once when a world is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub chunk_width: f32,
    pub chunk_height: f32,
    pub render_distance: i32,
}

impl WorldConfig {
    pub fn chunk_extent(&self) -> Vec2 {
        Vec2::new(self.chunk_width, self.chunk_height)
    }

    /// Chunk containing `position`. Uses floor division, so negative
    /// coordinates land in negative chunks.
    pub fn chunk_of(&self, position: Vec2) -> ChunkCoord {
        ChunkCoord::new(
            floor_div(position.x, self.chunk_width),
            floor_div(position.y, self.chunk_height),
        )
    }

    /// Reject extents that would make chunk bucketing meaningless.
    pub fn validate(&self) -> Result<(), WorldError> {
        for (axis, extent) in [("chunk_width", self.chunk_width), ("chunk_height", self.chunk_height)] {
            if !extent.is_finite() || extent <= 0.0 {
                return Err(WorldError::InvalidExtent { axis, extent });
            }
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_width: DEFAULT_CHUNK_SIZE,
            chunk_height: DEFAULT_CHUNK_SIZE,
            render_distance: DEFAULT_RENDER_DISTANCE,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {id} is not in this world")]
    EntityNotFound { id: EntityId },

    #[error("entity {id} is already attached to a world")]
    AlreadyAttached { id: EntityId },

    #[error("{axis} must be a positive finite number, got {extent}")]
    InvalidExtent { axis: &'static str, extent: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_positions_floor_into_negative_chunks() {
        let config = WorldConfig::default();
        assert_eq!(config.chunk_of(Vec2::new(-1.0, -1.0)), ChunkCoord::new(-1, -1));
        assert_eq!(config.chunk_of(Vec2::new(0.0, 0.0)), ChunkCoord::new(0, 0));
        assert_eq!(config.chunk_of(Vec2::new(4095.9, 4096.0)), ChunkCoord::new(0, 1));
        assert_eq!(config.chunk_of(Vec2::new(-4096.0, -4097.0)), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn config_fills_missing_fields_from_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{ "chunk_width": 256.0 }"#).unwrap();
        assert_eq!(config.chunk_width, 256.0);
        assert_eq!(config.chunk_height, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.render_distance, DEFAULT_RENDER_DISTANCE);
    }

    #[test]
    fn degenerate_extents_fail_validation() {
        assert!(WorldConfig::default().validate().is_ok());

        let zero: WorldConfig = serde_json::from_str(r#"{ "chunk_width": 0.0 }"#).unwrap();
        assert!(matches!(
            zero.validate(),
            Err(WorldError::InvalidExtent { axis: "chunk_width", .. })
        ));

        for extent in [-16.0, f32::NAN, f32::INFINITY] {
            let config = WorldConfig {
                chunk_height: extent,
                ..WorldConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(WorldError::InvalidExtent { axis: "chunk_height", .. })
            ));
        }
    }
}
