use crate::world::{Chunk, ChunkCoord};
use crate::math::Vec2;
use std::collections::BTreeMap;
use tracing::debug;

/// One z-level of the world: a sparse, lazily grown map of chunks.
#[derive(Debug, Clone)]
pub struct Layer {
    zlevel: i32,
    chunk_extent: Vec2,
    chunks: BTreeMap<ChunkCoord, Chunk>,
    pending_removals: Vec<ChunkCoord>,
}

impl Layer {
    pub fn new(zlevel: i32, chunk_extent: Vec2) -> Self {
        Self {
            zlevel,
            chunk_extent,
            chunks: BTreeMap::new(),
            pending_removals: Vec::new(),
        }
    }

    #[inline]
    pub fn zlevel(&self) -> i32 {
        self.zlevel
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Chunk at `coord`, created empty if it doesn't exist yet.
    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> &mut Chunk {
        let extent = self.chunk_extent;
        let zlevel = self.zlevel;
        self.chunks.entry(coord).or_insert_with(|| {
            debug!(chunk = %coord, zlevel, "chunk created");
            Chunk::new(coord, extent)
        })
    }

    pub(crate) fn existing_chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Entities resident in any chunk of this layer.
    pub fn resident_count(&self) -> usize {
        self.chunks.values().map(Chunk::len).sum()
    }

    /// Queue a chunk for removal at the next flush.
    pub fn remove_chunk(&mut self, coord: ChunkCoord) {
        if !self.pending_removals.contains(&coord) {
            self.pending_removals.push(coord);
        }
    }

    pub fn pending_chunk_removals(&self) -> &[ChunkCoord] {
        &self.pending_removals
    }

    /// Apply queued chunk removals, handing back the removed chunks.
    pub(crate) fn take_removed_chunks(&mut self) -> Vec<Chunk> {
        let coords = std::mem::take(&mut self.pending_removals);
        coords
            .into_iter()
            .filter_map(|coord| self.chunks.remove(&coord))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;

    #[test]
    fn chunks_are_created_lazily_and_once() {
        let mut layer = Layer::new(2, Vec2::splat(64.0));
        assert!(layer.chunk(ChunkCoord::new(1, 1)).is_none());

        layer.chunk_mut(ChunkCoord::new(1, 1)).insert(EntityId::from_raw(1));
        layer.chunk_mut(ChunkCoord::new(1, 1));
        assert_eq!(layer.chunk_count(), 1);
        assert_eq!(layer.resident_count(), 1);
        assert_eq!(layer.chunk(ChunkCoord::new(1, 1)).unwrap().extent(), Vec2::splat(64.0));
    }

    #[test]
    fn chunk_removal_waits_for_flush() {
        let mut layer = Layer::new(0, Vec2::splat(64.0));
        layer.chunk_mut(ChunkCoord::new(0, 0));
        layer.remove_chunk(ChunkCoord::new(0, 0));
        layer.remove_chunk(ChunkCoord::new(0, 0));
        layer.remove_chunk(ChunkCoord::new(9, 9));
        assert_eq!(layer.chunk_count(), 1);
        assert_eq!(layer.pending_chunk_removals().len(), 2);

        let removed = layer.take_removed_chunks();
        assert_eq!(removed.len(), 1);
        assert_eq!(layer.chunk_count(), 0);
        assert!(layer.pending_chunk_removals().is_empty());
    }
}
