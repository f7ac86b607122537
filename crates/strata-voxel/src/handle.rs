//! Lightweight, copyable reference to a single voxel slot.

use std::sync::Arc;

use glam::Vec3;
use strata_math::{ChunkCoord, LocalCoord};

use crate::chunk::VoxelChunk;
use crate::storage::WaterState;
use crate::types::VoxelTypeId;

/// A `(chunk, local position)` pair resolving lazily to a slot in that
/// chunk's voxel arrays.
///
/// Handles have value semantics: they are cheap to clone, many may
/// reference the same slot concurrently, and they carry no lifetime
/// guarantee beyond the chunk's own — a handle into a chunk that has been
/// removed from the registry still reads that chunk's final state and
/// must be re-resolved by coordinate if current data is needed.
#[derive(Clone, Debug)]
pub struct VoxelHandle {
    chunk: Arc<VoxelChunk>,
    local: LocalCoord,
}

impl VoxelHandle {
    /// Creates a handle. The local coordinate is the caller's contract.
    pub fn new(chunk: Arc<VoxelChunk>, local: LocalCoord) -> Self {
        Self { chunk, local }
    }

    /// The referenced chunk.
    pub fn chunk(&self) -> &Arc<VoxelChunk> {
        &self.chunk
    }

    /// The referenced chunk's coordinate.
    pub fn chunk_coord(&self) -> ChunkCoord {
        self.chunk.coord()
    }

    /// Position within the chunk.
    pub fn local(&self) -> LocalCoord {
        self.local
    }

    /// World position of the voxel's least corner.
    pub fn world_min(&self) -> Vec3 {
        self.chunk.origin()
            + Vec3::new(self.local.x as f32, self.local.y as f32, self.local.z as f32)
    }

    /// World position of the voxel's center.
    pub fn world_center(&self) -> Vec3 {
        self.world_min() + Vec3::splat(0.5)
    }

    /// Current voxel type.
    pub fn voxel_type(&self) -> VoxelTypeId {
        self.chunk.data().read().type_at(self.local)
    }

    /// True iff the slot currently holds the empty type.
    pub fn is_empty(&self) -> bool {
        self.voxel_type().is_empty()
    }

    /// Current health.
    pub fn health(&self) -> u8 {
        self.chunk.data().read().health_at(self.local)
    }

    /// Current sunlight intensity.
    pub fn sun(&self) -> u8 {
        self.chunk.data().read().sun_at(self.local)
    }

    /// Whether the voxel has been revealed.
    pub fn explored(&self) -> bool {
        self.chunk.data().read().explored_at(self.local)
    }

    /// Current liquid state.
    pub fn water(&self) -> WaterState {
        self.chunk.data().read().water_at(self.local)
    }
}

impl PartialEq for VoxelHandle {
    /// Two handles are equal when they reference the same slot: same
    /// chunk coordinate, same local position.
    fn eq(&self, other: &Self) -> bool {
        self.chunk.coord() == other.chunk.coord() && self.local == other.local
    }
}

impl Eq for VoxelHandle {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use strata_math::ChunkDims;

    #[test]
    fn test_handle_resolves_current_state() {
        let chunk = Arc::new(VoxelChunk::new(ChunkCoord::new(0, 0, 0), ChunkDims::new(8, 8, 8)));
        let local = LocalCoord::new(2, 3, 4);
        let handle = VoxelHandle::new(Arc::clone(&chunk), local);

        assert!(handle.is_empty());
        chunk.set_voxel_type(local, VoxelTypeId(5));
        assert_eq!(handle.voxel_type(), VoxelTypeId(5), "handle sees later mutation");
        assert_eq!(handle.health(), 255);
    }

    #[test]
    fn test_world_positions() {
        let chunk = Arc::new(VoxelChunk::new(
            ChunkCoord::new(-1, 0, 0),
            ChunkDims::new(16, 16, 16),
        ));
        let handle = VoxelHandle::new(chunk, LocalCoord::new(0, 5, 15));
        assert_eq!(handle.world_min(), Vec3::new(-16.0, 5.0, 15.0));
        assert_eq!(handle.world_center(), Vec3::new(-15.5, 5.5, 15.5));
    }

    #[test]
    fn test_equality_is_by_slot() {
        let chunk = Arc::new(VoxelChunk::new(ChunkCoord::new(0, 0, 0), ChunkDims::new(8, 8, 8)));
        let a = VoxelHandle::new(Arc::clone(&chunk), LocalCoord::new(1, 1, 1));
        let b = VoxelHandle::new(Arc::clone(&chunk), LocalCoord::new(1, 1, 1));
        let c = VoxelHandle::new(chunk, LocalCoord::new(2, 1, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
