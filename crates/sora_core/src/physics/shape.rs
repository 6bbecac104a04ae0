use crate::ecs::AsAny;
use crate::math::{Rect, Vec2};
use std::fmt;

/// Tag identifying a shape type in the field's handler tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeKind(&'static str);

impl ShapeKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Collision geometry attached to a collider.
pub trait Shape: AsAny + Send + fmt::Debug {
    fn kind(&self) -> ShapeKind;

    /// World-space bounding box when the shape is centred on `center`.
    fn bounds(&self, center: Vec2) -> Rect;
}

impl<'a> dyn Shape + 'a {
    pub fn downcast_ref<T: Shape>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Axis-aligned box, centred on its entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub size: Vec2,
}

impl Aabb {
    pub const KIND: ShapeKind = ShapeKind::new("aabb");

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
        }
    }
}

impl Shape for Aabb {
    fn kind(&self) -> ShapeKind {
        Self::KIND
    }

    fn bounds(&self, center: Vec2) -> Rect {
        Rect::from_center(center, self.size)
    }
}
