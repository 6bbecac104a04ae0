use crate::ids::{ComponentId, EntityId};
use crate::math::Vec2;
use crate::physics::{CollisionMask, Shape, ShapeKind};

/// Colliders share the component id space.
pub type ColliderId = ComponentId;

/// Interaction body registered with an [`InteractionField`](crate::physics::InteractionField).
#[derive(Debug)]
pub struct Collider {
    owner: EntityId,
    shape: Box<dyn Shape>,
    pub mask: CollisionMask,
    /// Static bodies have infinite mass and are never moved by resolution.
    pub is_static: bool,
    pub velocity: Vec2,
    mass: f32,
}

impl Collider {
    pub fn new(owner: EntityId, shape: impl Shape + 'static) -> Self {
        Self {
            owner,
            shape: Box::new(shape),
            mask: CollisionMask::ALL,
            is_static: false,
            velocity: Vec2::ZERO,
            mass: 1.0,
        }
    }

    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[inline]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn shape(&self) -> &dyn Shape {
        &*self.shape
    }

    pub fn shape_kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }
}
