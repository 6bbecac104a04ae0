//! 2D interaction field
//!
//! Colliders pair a [`Shape`] with the physical state the resolver needs
//! (mask, static flag, velocity, mass). The [`InteractionField`] owns them,
//! moves dynamic bodies, detects overlapping pairs and resolves them through
//! handlers registered per shape pair.

mod aabb;
mod collider;
mod field;
mod shape;

pub use aabb::{detect_aabb_aabb, resolve_aabb_aabb};
pub use collider::{Collider, ColliderId};
pub use field::{Body, BodyMut, DetectFn, InteractionField, Manifold, MaskPolicy, ResolveFn};
pub use shape::{Aabb, Shape, ShapeKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Added to every half-overlap so separated bodies stop touching.
pub const SEPARATION_EPSILON: f32 = 0.0001;

/// Collision layer bitfield.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    /// Mask with only bit `n` set.
    pub const fn bit(n: u32) -> Self {
        Self(1 << n)
    }

    /// Default pairing policy: the masks share at least one bit.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for CollisionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("no detection function registered for shapes '{a}' and '{b}'")]
    MissingDetector { a: ShapeKind, b: ShapeKind },

    #[error("no resolution function registered for shapes '{a}' and '{b}'")]
    MissingResolver { a: ShapeKind, b: ShapeKind },

    #[error("collider {id} is not registered with the field")]
    UnknownCollider { id: ColliderId },

    #[error("dynamic colliders need a positive finite mass, got {mass}")]
    InvalidMass { mass: f32 },
}
