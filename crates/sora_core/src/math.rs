//! Engine math
//!
//! Re-exports glam with the rectangle and bucketing helpers the world and
//! physics layers share.

pub use glam::*;

/// Axis-aligned rectangle stored as top-left corner plus size.
///
/// Overlap follows the usual raster convention: rectangles that only share an
/// edge do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size * 0.5,
            size,
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.min = center - self.size * 0.5;
    }

    pub fn set_center_x(&mut self, x: f32) {
        self.min.x = x - self.size.x * 0.5;
    }

    pub fn set_center_y(&mut self, y: f32) {
        self.min.y = y - self.size.y * 0.5;
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && other.min.x < a_max.x && self.min.y < b_max.y && other.min.y < a_max.y
    }

    /// Corner points in world space, clockwise from the top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let max = self.max();
        [
            self.min,
            Vec2::new(max.x, self.min.y),
            max,
            Vec2::new(self.min.x, max.y),
        ]
    }
}

/// Projects both point sets onto `axis` and returns the length of the shared
/// interval, or `0.0` when the projections are disjoint.
pub fn single_axis_overlap(a: &[Vec2], b: &[Vec2], axis: Vec2) -> f32 {
    let (a_min, a_max) = project(a, axis);
    let (b_min, b_max) = project(b, axis);
    (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Floor division of a world coordinate by a cell extent.
///
/// Negative coordinates round toward negative infinity, so `-1 / 4096`
/// lands in cell `-1`, not `0`.
#[inline]
pub fn floor_div(value: f32, extent: f32) -> i32 {
    (value / extent).floor() as i32
}
