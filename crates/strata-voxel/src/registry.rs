//! The authoritative map from chunk coordinate to chunk.
//!
//! [`ChunkRegistry`] is the single source of truth for which chunks exist:
//! every other component holds coordinates or [`VoxelHandle`]s, never an
//! owning reference of its own. The map supports concurrent lookups from
//! worker threads; inserts and removals happen on the owner thread only.
//! Removal is atomic — a concurrent reader sees the old state or the
//! fully-removed state, never a half-removed chunk.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use dashmap::DashMap;
use glam::Vec3;
use strata_math::{
    Aabb, ChunkCoord, ChunkDims, LocalCoord, XZ_NEIGHBOR_OFFSETS, world_to_chunk, world_to_local,
};

use crate::chunk::VoxelChunk;
use crate::events::{ChunkEvent, ChunkEventBuffer};
use crate::handle::VoxelHandle;
use crate::types::{VoxelTypeId, VoxelTypeRegistry};

/// Opaque identifier of a physics body in the external collision index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// External collision/body index consulted when chunks are removed.
pub trait CollisionIndex: Send + Sync {
    /// All bodies whose bounding volume intersects `bounds`.
    fn bodies_intersecting(&self, bounds: Aabb) -> Vec<BodyId>;
    /// Flags a body for removal by its owning system.
    fn mark_dead(&self, body: BodyId);
}

/// Collision index that knows no bodies. Used by tests and worlds without
/// physics.
pub struct NullCollisionIndex;

impl CollisionIndex for NullCollisionIndex {
    fn bodies_intersecting(&self, _bounds: Aabb) -> Vec<BodyId> {
        Vec::new()
    }

    fn mark_dead(&self, _body: BodyId) {}
}

/// The chunk registry: coordinate→chunk map, admission control, voxel
/// resolution, neighbor maintenance, and the global viewing slice.
pub struct ChunkRegistry {
    chunks: DashMap<ChunkCoord, Arc<VoxelChunk>>,
    dims: ChunkDims,
    /// Admission ceiling: inserts beyond this count are rejected.
    max_chunks: usize,
    /// Highest world-Y level currently revealed. Voxels above it are
    /// treated as invisible by ray picking and lighting.
    max_view_slice: AtomicI32,
    voxel_types: Arc<VoxelTypeRegistry>,
    events: ChunkEventBuffer,
    collision: Arc<dyn CollisionIndex>,
}

impl ChunkRegistry {
    /// Creates an empty registry.
    pub fn new(
        dims: ChunkDims,
        max_chunks: usize,
        voxel_types: Arc<VoxelTypeRegistry>,
        collision: Arc<dyn CollisionIndex>,
    ) -> Self {
        Self {
            chunks: DashMap::new(),
            dims,
            max_chunks,
            max_view_slice: AtomicI32::new(i32::MAX),
            voxel_types,
            events: ChunkEventBuffer::new(),
            collision,
        }
    }

    /// Chunk dimensions shared by every chunk in this registry.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// The immutable voxel type table.
    pub fn voxel_types(&self) -> &Arc<VoxelTypeRegistry> {
        &self.voxel_types
    }

    /// The outbound event buffer, drained by the owner thread each frame.
    pub fn events(&self) -> &ChunkEventBuffer {
        &self.events
    }

    /// Number of chunks currently present.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Snapshot of every present chunk coordinate.
    pub fn chunk_coords(&self) -> Vec<ChunkCoord> {
        self.chunks.iter().map(|e| *e.key()).collect()
    }

    /// Snapshot of every present chunk.
    pub fn chunks(&self) -> Vec<Arc<VoxelChunk>> {
        self.chunks.iter().map(|e| Arc::clone(e.value())).collect()
    }

    // -- admission ----------------------------------------------------------

    /// Inserts a chunk iff the chunk count is below the ceiling and the
    /// coordinate is unoccupied.
    ///
    /// Returns `false` otherwise — admission control, not an error.
    /// Newly admitted chunks are linked into their neighbors' tables both
    /// ways. Only the owner thread inserts.
    pub fn add_chunk(&self, chunk: Arc<VoxelChunk>) -> bool {
        if chunk.dims() != self.dims {
            tracing::warn!(
                "rejecting chunk {:?}: dims {:?} != registry dims {:?}",
                chunk.coord(),
                chunk.dims(),
                self.dims
            );
            return false;
        }
        if self.chunks.len() >= self.max_chunks {
            tracing::debug!("chunk map at capacity ({}), rejecting insert", self.max_chunks);
            return false;
        }
        let coord = chunk.coord();
        if self.chunks.contains_key(&coord) {
            return false;
        }

        self.chunks.insert(coord, Arc::clone(&chunk));
        self.link_neighbors(&chunk);
        true
    }

    /// Removes the chunk at `coord`, marking intersecting bodies dead and
    /// detaching the chunk from every neighbor's table.
    ///
    /// Returns `false` if no chunk was present. The map removal itself is
    /// atomic; any handle still referencing the chunk keeps reading its
    /// final state but the coordinate resolves to nothing.
    pub fn remove_chunk(&self, coord: ChunkCoord) -> bool {
        let Some((_, chunk)) = self.chunks.remove(&coord) else {
            return false;
        };

        for body in self.collision.bodies_intersecting(chunk.bounds()) {
            self.collision.mark_dead(body);
        }

        for neighbor in chunk.neighbors() {
            if let Some(other) = self.chunks.get(&neighbor) {
                other.remove_neighbor(coord);
            }
        }
        chunk.clear_neighbors();

        self.events.push(ChunkEvent::ChunkRemoved { chunk: coord });
        tracing::debug!("removed chunk {coord:?}");
        true
    }

    // -- lookup -------------------------------------------------------------

    /// The chunk at a chunk coordinate.
    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<Arc<VoxelChunk>> {
        self.chunks.get(&coord).map(|e| Arc::clone(e.value()))
    }

    /// The chunk containing a world position.
    pub fn chunk_at(&self, world: Vec3) -> Option<Arc<VoxelChunk>> {
        self.get_chunk(world_to_chunk(world, self.dims))
    }

    /// Resolves a world position to a voxel handle.
    ///
    /// `hint` short-circuits the map lookup when the position falls inside
    /// the hinted chunk — the hot path for spatially local query streams.
    /// Returns `None` when the chunk is not loaded; callers must treat
    /// absence as "unloaded," not "empty."
    pub fn get_voxel(&self, world: Vec3, hint: Option<&Arc<VoxelChunk>>) -> Option<VoxelHandle> {
        if let Some(chunk) = hint
            && let Some(local) = world_to_local(chunk.origin(), world, self.dims)
        {
            return Some(VoxelHandle::new(Arc::clone(chunk), local));
        }
        let chunk = self.chunk_at(world)?;
        let local = world_to_local(chunk.origin(), world, self.dims)?;
        Some(VoxelHandle::new(chunk, local))
    }

    /// Like [`get_voxel`](Self::get_voxel) but treats a present-but-empty
    /// voxel as a miss, probing the six face-adjacent positions for the
    /// nearest non-empty voxel. Used for "find nearest solid surface"
    /// queries.
    pub fn get_non_null_voxel(&self, world: Vec3) -> Option<VoxelHandle> {
        let primary = self.get_voxel(world, None);
        if let Some(handle) = &primary
            && !handle.is_empty()
        {
            return primary;
        }

        let hint = primary.map(|h| Arc::clone(h.chunk()));
        let mut best: Option<(f32, VoxelHandle)> = None;
        for offset in [
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ] {
            let probe = world + offset;
            let Some(handle) = self.get_voxel(probe, hint.as_ref()) else {
                continue;
            };
            if handle.is_empty() {
                continue;
            }
            let dist = (handle.world_center() - world).length_squared();
            if best.as_ref().is_none_or(|(d, _)| dist < *d) {
                best = Some((dist, handle));
            }
        }
        best.map(|(_, h)| h)
    }

    // -- mutation entry points ----------------------------------------------

    /// Sets the voxel type at a world position. Returns `true` iff the
    /// voxel changed. Boundary mutations invalidate every neighbor chunk.
    pub fn set_voxel(&self, world: Vec3, id: VoxelTypeId) -> bool {
        let Some(handle) = self.get_voxel(world, None) else {
            return false;
        };
        match handle.chunk().set_voxel_type(handle.local(), id) {
            Some(old) if old != id => {
                self.propagate_boundary_dirty(handle.chunk(), handle.local());
                true
            }
            _ => false,
        }
    }

    /// Destroys the voxel at a world position, firing the destruction
    /// event. Returns `true` iff a non-empty voxel was removed.
    pub fn destroy_voxel(&self, world: Vec3) -> bool {
        let Some(handle) = self.get_voxel(world, None) else {
            return false;
        };
        if handle.chunk().destroy_voxel(handle.local(), &self.events) {
            self.propagate_boundary_dirty(handle.chunk(), handle.local());
            true
        } else {
            false
        }
    }

    /// Applies damage to the voxel at a world position. Returns `true`
    /// iff the damage destroyed it.
    pub fn damage_voxel(&self, world: Vec3, amount: u8) -> bool {
        let Some(handle) = self.get_voxel(world, None) else {
            return false;
        };
        if handle.chunk().apply_damage(handle.local(), amount, &self.events) {
            self.propagate_boundary_dirty(handle.chunk(), handle.local());
            true
        } else {
            false
        }
    }

    /// Marks the voxel at a world position explored. Returns `true` on
    /// the first reveal.
    pub fn mark_explored(&self, world: Vec3) -> bool {
        let Some(handle) = self.get_voxel(world, None) else {
            return false;
        };
        handle.chunk().mark_explored(handle.local(), &self.events)
    }

    /// Boundary rule of the rebuild state machine: a mutation on a chunk
    /// face also marks every existing neighbor chunk mesh- and
    /// lighting-dirty, because seams and vertex lighting sample across
    /// the boundary.
    fn propagate_boundary_dirty(&self, chunk: &Arc<VoxelChunk>, local: LocalCoord) {
        if chunk.is_interior(local) {
            return;
        }
        for neighbor in chunk.neighbors() {
            if let Some(other) = self.chunks.get(&neighbor) {
                other.mark_mesh_dirty();
                other.mark_lighting_dirty();
            }
        }
    }

    // -- neighbors ----------------------------------------------------------

    /// Links a freshly admitted chunk into the tables of the eight
    /// XZ-adjacent chunks, both directions.
    fn link_neighbors(&self, chunk: &Arc<VoxelChunk>) {
        let coord = chunk.coord();
        for (dx, dz) in XZ_NEIGHBOR_OFFSETS {
            let n = coord.offset(dx, 0, dz);
            if let Some(other) = self.chunks.get(&n) {
                chunk.add_neighbor(n);
                other.add_neighbor(coord);
            }
        }
    }

    /// Rebuilds every chunk's neighbor table from scratch.
    ///
    /// O(chunks), idempotent, and produces the symmetry invariant: A
    /// lists B iff B lists A, for every XZ-adjacent present pair.
    pub fn recompute_neighbors(&self) {
        let coords = self.chunk_coords();
        for &coord in &coords {
            if let Some(chunk) = self.get_chunk(coord) {
                chunk.clear_neighbors();
            }
        }
        for &coord in &coords {
            let Some(chunk) = self.get_chunk(coord) else {
                continue;
            };
            for (dx, dz) in XZ_NEIGHBOR_OFFSETS {
                let n = coord.offset(dx, 0, dz);
                if self.chunks.contains_key(&n) {
                    chunk.add_neighbor(n);
                }
            }
        }
    }

    // -- box query ----------------------------------------------------------

    /// Every voxel whose cell overlaps `bounds`, as handles.
    ///
    /// Enumerates the chunks overlapping the box, then the voxels inside
    /// each chunk overlapping the box. Unloaded chunks contribute nothing.
    pub fn voxels_intersecting(&self, bounds: &Aabb) -> Vec<VoxelHandle> {
        let mut out = Vec::new();
        let min_chunk = world_to_chunk(bounds.min, self.dims);
        let max_chunk = world_to_chunk(bounds.max, self.dims);

        for cx in min_chunk.x..=max_chunk.x {
            for cy in min_chunk.y..=max_chunk.y {
                for cz in min_chunk.z..=max_chunk.z {
                    let Some(chunk) = self.get_chunk(ChunkCoord::new(cx, cy, cz)) else {
                        continue;
                    };
                    self.collect_chunk_voxels(&chunk, bounds, &mut out);
                }
            }
        }
        out
    }

    fn collect_chunk_voxels(
        &self,
        chunk: &Arc<VoxelChunk>,
        bounds: &Aabb,
        out: &mut Vec<VoxelHandle>,
    ) {
        let origin = chunk.origin();
        let clamp = |lo: f32, hi: f32, size: usize| -> Option<(usize, usize)> {
            let a = (lo.floor() as i64).max(0);
            let b = (hi.floor() as i64).min(size as i64 - 1);
            (a <= b).then_some((a as usize, b as usize))
        };
        let Some((x0, x1)) = clamp(bounds.min.x - origin.x, bounds.max.x - origin.x, self.dims.x)
        else {
            return;
        };
        let Some((y0, y1)) = clamp(bounds.min.y - origin.y, bounds.max.y - origin.y, self.dims.y)
        else {
            return;
        };
        let Some((z0, z1)) = clamp(bounds.min.z - origin.z, bounds.max.z - origin.z, self.dims.z)
        else {
            return;
        };

        for z in z0..=z1 {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    out.push(VoxelHandle::new(
                        Arc::clone(chunk),
                        LocalCoord::new(x, y, z),
                    ));
                }
            }
        }
    }

    // -- viewing slice ------------------------------------------------------

    /// Highest world-Y level currently revealed.
    pub fn max_view_slice(&self) -> i32 {
        self.max_view_slice.load(Ordering::Acquire)
    }

    /// True iff a voxel at world height `y` is within the revealed slice.
    pub fn is_visible_y(&self, y: i32) -> bool {
        y <= self.max_view_slice()
    }

    /// Moves the viewing slice, marking mesh+lighting dirty on every
    /// chunk whose Y-extent intersects the band between the old and new
    /// levels.
    pub fn set_max_view_slice(&self, y: i32) {
        let old = self.max_view_slice.swap(y, Ordering::AcqRel);
        if old == y {
            return;
        }
        let lo = old.min(y);
        let hi = old.max(y);
        for entry in self.chunks.iter() {
            let chunk = entry.value();
            let y_min = chunk.origin().y as i32;
            let y_max = y_min + self.dims.y as i32 - 1;
            if y_min <= hi && y_max >= lo {
                chunk.mark_mesh_dirty();
                chunk.mark_lighting_dirty();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoxelTypeDef;
    use parking_lot::Mutex;

    fn dims() -> ChunkDims {
        ChunkDims::new(8, 8, 8)
    }

    fn test_types() -> Arc<VoxelTypeRegistry> {
        let mut reg = VoxelTypeRegistry::new();
        reg.register(VoxelTypeDef {
            name: "stone".to_string(),
            solid: true,
            light_emission: 0,
            ramp_capable: true,
        })
        .expect("register stone");
        Arc::new(reg)
    }

    fn registry() -> ChunkRegistry {
        ChunkRegistry::new(dims(), 64, test_types(), Arc::new(NullCollisionIndex))
    }

    fn insert_chunk(reg: &ChunkRegistry, x: i32, y: i32, z: i32) -> Arc<VoxelChunk> {
        let chunk = Arc::new(VoxelChunk::new(ChunkCoord::new(x, y, z), dims()));
        assert!(reg.add_chunk(Arc::clone(&chunk)));
        chunk
    }

    const STONE: VoxelTypeId = VoxelTypeId(1);

    #[test]
    fn test_add_chunk_is_idempotent_admission() {
        let reg = registry();
        let c = Arc::new(VoxelChunk::new(ChunkCoord::new(1, 2, 3), dims()));
        assert!(reg.add_chunk(Arc::clone(&c)));
        assert!(!reg.add_chunk(Arc::clone(&c)), "second insert at same coord rejected");
        assert_eq!(reg.chunk_count(), 1);
    }

    #[test]
    fn test_add_chunk_respects_capacity() {
        let reg = ChunkRegistry::new(dims(), 2, test_types(), Arc::new(NullCollisionIndex));
        insert_chunk(&reg, 0, 0, 0);
        insert_chunk(&reg, 1, 0, 0);
        let third = Arc::new(VoxelChunk::new(ChunkCoord::new(2, 0, 0), dims()));
        assert!(!reg.add_chunk(third), "insert beyond capacity rejected");
        assert_eq!(reg.chunk_count(), 2);
    }

    #[test]
    fn test_add_chunk_rejects_wrong_dims() {
        let reg = registry();
        let wrong = Arc::new(VoxelChunk::new(ChunkCoord::new(0, 0, 0), ChunkDims::new(4, 4, 4)));
        assert!(!reg.add_chunk(wrong));
    }

    #[test]
    fn test_missing_chunk_queries_return_none() {
        let reg = registry();
        assert!(reg.chunk_at(Vec3::new(100.0, 0.0, 0.0)).is_none());
        assert!(reg.get_voxel(Vec3::new(100.0, 0.0, 0.0), None).is_none());
        assert!(!reg.set_voxel(Vec3::new(100.0, 0.0, 0.0), STONE));
        assert!(!reg.destroy_voxel(Vec3::new(100.0, 0.0, 0.0)));
        assert!(!reg.remove_chunk(ChunkCoord::new(9, 9, 9)));
    }

    #[test]
    fn test_get_voxel_with_hint_skips_lookup() {
        let reg = registry();
        let chunk = insert_chunk(&reg, 0, 0, 0);

        let handle = reg
            .get_voxel(Vec3::new(3.0, 4.0, 5.0), Some(&chunk))
            .expect("hinted resolve");
        assert_eq!(handle.local(), LocalCoord::new(3, 4, 5));
        assert!(Arc::ptr_eq(handle.chunk(), &chunk));

        // A position outside the hinted chunk falls back to the registry.
        let other = insert_chunk(&reg, 1, 0, 0);
        let handle = reg
            .get_voxel(Vec3::new(9.0, 0.0, 0.0), Some(&chunk))
            .expect("fallback resolve");
        assert!(Arc::ptr_eq(handle.chunk(), &other));
    }

    #[test]
    fn test_get_non_null_voxel_falls_back_to_nearby_solid() {
        let reg = registry();
        let chunk = insert_chunk(&reg, 0, 0, 0);
        chunk.set_voxel_type(LocalCoord::new(3, 2, 3), STONE);

        // The queried voxel itself is empty; the solid below should win.
        let handle = reg
            .get_non_null_voxel(Vec3::new(3.5, 3.5, 3.5))
            .expect("nearby solid found");
        assert_eq!(handle.local(), LocalCoord::new(3, 2, 3));

        // Nothing solid anywhere near: miss.
        assert!(reg.get_non_null_voxel(Vec3::new(6.5, 6.5, 6.5)).is_none());
    }

    #[test]
    fn test_neighbor_symmetry_after_recompute() {
        let reg = registry();
        for x in 0..3 {
            for z in 0..3 {
                insert_chunk(&reg, x, 0, z);
            }
        }
        reg.recompute_neighbors();

        for a_coord in reg.chunk_coords() {
            let a = reg.get_chunk(a_coord).expect("chunk present");
            for n in a.neighbors() {
                let b = reg.get_chunk(n).expect("neighbor present in registry");
                assert!(
                    b.has_neighbor(a_coord),
                    "symmetry violated: {a_coord:?} lists {n:?} but not vice versa"
                );
            }
        }

        // Center chunk has all 8 XZ neighbors; corner has 3.
        let center = reg.get_chunk(ChunkCoord::new(1, 0, 1)).expect("center");
        assert_eq!(center.neighbors().len(), 8);
        let corner = reg.get_chunk(ChunkCoord::new(0, 0, 0)).expect("corner");
        assert_eq!(corner.neighbors().len(), 3);
    }

    #[test]
    fn test_recompute_neighbors_is_idempotent() {
        let reg = registry();
        insert_chunk(&reg, 0, 0, 0);
        insert_chunk(&reg, 1, 0, 0);
        reg.recompute_neighbors();
        let mut before = reg
            .get_chunk(ChunkCoord::new(0, 0, 0))
            .expect("chunk")
            .neighbors();
        before.sort();
        reg.recompute_neighbors();
        let mut after = reg
            .get_chunk(ChunkCoord::new(0, 0, 0))
            .expect("chunk")
            .neighbors();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_add_chunk_links_neighbors_immediately() {
        let reg = registry();
        let a = insert_chunk(&reg, 0, 0, 0);
        let b = insert_chunk(&reg, 1, 0, 1);
        assert!(a.has_neighbor(ChunkCoord::new(1, 0, 1)));
        assert!(b.has_neighbor(ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn test_remove_chunk_detaches_all_references() {
        let reg = registry();
        insert_chunk(&reg, 0, 0, 0);
        let b = insert_chunk(&reg, 1, 0, 0);
        reg.recompute_neighbors();

        assert!(reg.remove_chunk(ChunkCoord::new(0, 0, 0)));
        assert!(reg.chunk_at(Vec3::new(4.0, 4.0, 4.0)).is_none());
        assert!(
            !b.has_neighbor(ChunkCoord::new(0, 0, 0)),
            "no neighbor table still references the removed chunk"
        );
        let events = reg.events().read();
        assert!(events.contains(&ChunkEvent::ChunkRemoved {
            chunk: ChunkCoord::new(0, 0, 0)
        }));
    }

    #[test]
    fn test_remove_chunk_marks_intersecting_bodies_dead() {
        struct RecordingIndex {
            dead: Mutex<Vec<BodyId>>,
        }
        impl CollisionIndex for RecordingIndex {
            fn bodies_intersecting(&self, _bounds: Aabb) -> Vec<BodyId> {
                vec![BodyId(11), BodyId(42)]
            }
            fn mark_dead(&self, body: BodyId) {
                self.dead.lock().push(body);
            }
        }

        let index = Arc::new(RecordingIndex {
            dead: Mutex::new(Vec::new()),
        });
        let reg = ChunkRegistry::new(dims(), 64, test_types(), Arc::clone(&index) as _);
        let chunk = Arc::new(VoxelChunk::new(ChunkCoord::new(0, 0, 0), dims()));
        reg.add_chunk(chunk);

        reg.remove_chunk(ChunkCoord::new(0, 0, 0));
        assert_eq!(*index.dead.lock(), vec![BodyId(11), BodyId(42)]);
    }

    #[test]
    fn test_boundary_mutation_propagates_to_neighbors() {
        let reg = registry();
        let center = insert_chunk(&reg, 1, 0, 1);
        let mut neighbors = Vec::new();
        for x in 0..3 {
            for z in 0..3 {
                if (x, z) != (1, 1) {
                    neighbors.push(insert_chunk(&reg, x, 0, z));
                }
            }
        }
        reg.recompute_neighbors();

        // Boundary voxel (x = 8 is the -X face of the center chunk at world 8).
        assert!(reg.set_voxel(Vec3::new(8.0, 4.0, 12.0), STONE));
        for n in &neighbors {
            assert!(n.mesh_dirty(), "neighbor {:?} not marked", n.coord());
            assert!(n.lighting_dirty());
        }
        assert!(center.mesh_dirty());
    }

    #[test]
    fn test_interior_mutation_stays_local() {
        let reg = registry();
        let center = insert_chunk(&reg, 0, 0, 0);
        let neighbor = insert_chunk(&reg, 1, 0, 0);
        reg.recompute_neighbors();

        assert!(reg.set_voxel(Vec3::new(4.0, 4.0, 4.0), STONE));
        assert!(center.mesh_dirty());
        assert!(!neighbor.mesh_dirty(), "interior edit must not touch neighbors");
        assert!(!neighbor.lighting_dirty());
    }

    #[test]
    fn test_voxels_intersecting_box() {
        let reg = registry();
        insert_chunk(&reg, 0, 0, 0);
        insert_chunk(&reg, 1, 0, 0);

        // Box straddling the chunk seam at x = 8.
        let bounds = Aabb::new(Vec3::new(6.5, 0.0, 0.0), Vec3::new(9.5, 0.9, 0.9));
        let voxels = reg.voxels_intersecting(&bounds);
        // Cells x ∈ {6, 7} from chunk 0 and {8, 9} from chunk 1, y=0, z=0.
        assert_eq!(voxels.len(), 4);
        let xs: Vec<usize> = voxels
            .iter()
            .map(|h| h.chunk_coord().x as usize * 8 + h.local().x)
            .collect();
        assert!(xs.contains(&6) && xs.contains(&7) && xs.contains(&8) && xs.contains(&9));
    }

    #[test]
    fn test_view_slice_change_marks_intersecting_chunks() {
        let reg = registry();
        let low = insert_chunk(&reg, 0, 0, 0); // world y 0..8
        let high = insert_chunk(&reg, 0, 3, 0); // world y 24..32
        reg.set_max_view_slice(100);
        low.clear_mesh_rebuilt();
        low.clear_lighting_dirty();
        high.clear_mesh_rebuilt();
        high.clear_lighting_dirty();

        // Lowering the slice to 4 crosses both the high chunk's whole
        // extent and the low chunk's upper half.
        reg.set_max_view_slice(4);
        assert!(low.lighting_dirty());
        assert!(high.lighting_dirty());

        low.clear_lighting_dirty();
        high.clear_lighting_dirty();
        high.clear_mesh_rebuilt();

        // Moving within the high band only re-marks the high chunk.
        reg.set_max_view_slice(30);
        assert!(high.lighting_dirty());
        assert!(low.lighting_dirty(), "low chunk intersects band 4..30 as well");
    }
}
