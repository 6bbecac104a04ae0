use crate::ids::EntityId;
use crate::math::{Rect, Vec2};
use std::collections::BTreeSet;
use std::fmt;

/// Integer chunk coordinate. Displays as `"{x}||{y}"`, the chunk's string id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}||{}", self.x, self.y)
    }
}

/// Fixed-extent bucket of resident entities.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    extent: Vec2,
    residents: BTreeSet<EntityId>,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, extent: Vec2) -> Self {
        Self {
            coord,
            extent,
            residents: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn extent(&self) -> Vec2 {
        self.extent
    }

    /// World-space area covered by the chunk.
    pub fn bounds(&self) -> Rect {
        let min = Vec2::new(self.coord.x as f32, self.coord.y as f32) * self.extent;
        Rect::new(min, self.extent)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.residents.contains(&entity)
    }

    /// Resident ids in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.residents.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.residents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residents.is_empty()
    }

    pub(crate) fn insert(&mut self, entity: EntityId) -> bool {
        self.residents.insert(entity)
    }

    pub(crate) fn remove(&mut self, entity: EntityId) -> bool {
        self.residents.remove(&entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_string_format() {
        assert_eq!(ChunkCoord::new(3, -7).to_string(), "3||-7");
    }

    #[test]
    fn bounds_follow_coordinate() {
        let chunk = Chunk::new(ChunkCoord::new(-1, 2), Vec2::new(100.0, 50.0));
        let bounds = chunk.bounds();
        assert_eq!(bounds.min, Vec2::new(-100.0, 100.0));
        assert_eq!(bounds.max(), Vec2::new(0.0, 150.0));
    }

    #[test]
    fn residents_are_a_set() {
        let mut chunk = Chunk::new(ChunkCoord::default(), Vec2::splat(10.0));
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        assert!(chunk.insert(a));
        assert!(!chunk.insert(a));
        assert!(chunk.insert(b));
        assert_eq!(chunk.len(), 2);
        assert!(chunk.remove(a));
        assert!(!chunk.contains(a));
        assert_eq!(chunk.entities().collect::<Vec<_>>(), vec![b]);
    }
}
