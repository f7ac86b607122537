//! One cube of voxels: payload, neighbor table, and the rebuild-flag
//! state machine.
//!
//! Chunks are shared as `Arc<VoxelChunk>` between the owner thread and the
//! rebuild workers, so all mutable state is behind interior mutability:
//! the voxel payload in a `RwLock`, the flags as atomics. Each flag has
//! exactly one setter side and one clearer side (see the flag table in the
//! registry docs), so plain acquire/release atomics suffice — no lock
//! guards the flags themselves.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use strata_math::{Aabb, ChunkCoord, ChunkDims, LocalCoord, chunk_origin};

use crate::events::{ChunkEvent, ChunkEventBuffer};
use crate::storage::{RampKind, VoxelData, WaterState};
use crate::types::{VoxelTypeId, VoxelTypeRegistry};

/// The rebuild-request state machine of a chunk.
///
/// `should_*` flags mark a derived artifact stale; `*_pending` flags mark
/// it already queued so the scheduler never double-enqueues. Workers clear
/// `should` and `pending` together only after the computation succeeds.
#[derive(Debug, Default)]
struct ChunkFlags {
    should_rebuild_mesh: AtomicBool,
    rebuild_mesh_pending: AtomicBool,
    should_recalculate_lighting: AtomicBool,
    should_rebuild_liquid: AtomicBool,
    rebuild_liquid_pending: AtomicBool,
    reconstruct_ramps: AtomicBool,
}

/// A fixed-size cuboid of voxels: the unit of storage, scheduling, and
/// mesh generation.
#[derive(Debug)]
pub struct VoxelChunk {
    coord: ChunkCoord,
    origin: Vec3,
    dims: ChunkDims,
    data: RwLock<VoxelData>,
    /// Coordinates of the XZ-adjacent chunks currently present in the
    /// registry. Non-owning by construction: resolving a neighbor always
    /// goes back through the registry map.
    neighbors: Mutex<FxHashSet<ChunkCoord>>,
    flags: ChunkFlags,
    /// Monotonically increasing, incremented on each voxel mutation.
    version: AtomicU64,
}

impl VoxelChunk {
    /// Creates an all-empty chunk at `coord`.
    pub fn new(coord: ChunkCoord, dims: ChunkDims) -> Self {
        Self {
            coord,
            origin: chunk_origin(coord, dims),
            dims,
            data: RwLock::new(VoxelData::new(dims)),
            neighbors: Mutex::new(FxHashSet::default()),
            flags: ChunkFlags::default(),
            version: AtomicU64::new(0),
        }
    }

    /// Creates a chunk from an already-filled payload (generator or
    /// deserialization output). Dimensions are taken from the payload.
    pub fn from_data(coord: ChunkCoord, data: VoxelData) -> Self {
        let dims = data.dims();
        Self {
            coord,
            origin: chunk_origin(coord, dims),
            dims,
            data: RwLock::new(data),
            neighbors: Mutex::new(FxHashSet::default()),
            flags: ChunkFlags::default(),
            version: AtomicU64::new(0),
        }
    }

    /// Chunk-grid coordinate (registry key).
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World position of the least corner.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Voxel dimensions.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Aabb {
        Aabb::of_chunk(self.coord, self.dims)
    }

    /// The voxel payload lock. Workers take read locks for sampling and a
    /// write lock while rebuilding derived fields.
    pub fn data(&self) -> &RwLock<VoxelData> {
        &self.data
    }

    /// Current mutation counter.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// True iff `local` touches none of the six chunk faces.
    ///
    /// Interior voxels never require a neighbor-chunk lookup; boundary
    /// mutations must also invalidate the adjacent chunks.
    pub fn is_interior(&self, local: LocalCoord) -> bool {
        local.is_interior(self.dims)
    }

    // -- flag state machine -------------------------------------------------

    /// Marks the mesh stale.
    pub fn mark_mesh_dirty(&self) {
        self.flags.should_rebuild_mesh.store(true, Ordering::Release);
    }

    /// Marks sun/vertex lighting stale.
    pub fn mark_lighting_dirty(&self) {
        self.flags
            .should_recalculate_lighting
            .store(true, Ordering::Release);
    }

    /// Marks the liquid surface mesh stale. This is the callback surface
    /// the water simulation uses after mutating water cells.
    pub fn mark_liquid_dirty(&self) {
        self.flags.should_rebuild_liquid.store(true, Ordering::Release);
    }

    /// Marks ramp hints stale.
    pub fn mark_ramps_dirty(&self) {
        self.flags.reconstruct_ramps.store(true, Ordering::Release);
    }

    /// True iff the mesh is stale.
    pub fn mesh_dirty(&self) -> bool {
        self.flags.should_rebuild_mesh.load(Ordering::Acquire)
    }

    /// True iff a mesh rebuild is already queued.
    pub fn mesh_pending(&self) -> bool {
        self.flags.rebuild_mesh_pending.load(Ordering::Acquire)
    }

    /// True iff lighting is stale.
    pub fn lighting_dirty(&self) -> bool {
        self.flags
            .should_recalculate_lighting
            .load(Ordering::Acquire)
    }

    /// True iff the liquid mesh is stale.
    pub fn liquid_dirty(&self) -> bool {
        self.flags.should_rebuild_liquid.load(Ordering::Acquire)
    }

    /// True iff a liquid rebuild is already queued.
    pub fn liquid_pending(&self) -> bool {
        self.flags.rebuild_liquid_pending.load(Ordering::Acquire)
    }

    /// True iff ramp hints are stale.
    pub fn ramps_dirty(&self) -> bool {
        self.flags.reconstruct_ramps.load(Ordering::Acquire)
    }

    /// Scheduler-side transition: claims the chunk for a mesh rebuild.
    ///
    /// Returns `true` exactly once per dirty episode: when the mesh is
    /// stale and no rebuild is queued yet. The pending flip uses a
    /// compare-exchange so the scan-and-mark step stays race-free even if
    /// scheduling ever runs concurrently with itself.
    pub fn claim_mesh_rebuild(&self) -> bool {
        if !self.mesh_dirty() {
            return false;
        }
        self.flags
            .rebuild_mesh_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Scheduler-side transition: claims the chunk for a liquid rebuild.
    pub fn claim_liquid_rebuild(&self) -> bool {
        if !self.liquid_dirty() {
            return false;
        }
        self.flags
            .rebuild_liquid_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Worker-side transition: mesh rebuild completed successfully.
    /// Clears the stale and pending flags together.
    pub fn clear_mesh_rebuilt(&self) {
        self.flags.should_rebuild_mesh.store(false, Ordering::Release);
        self.flags.rebuild_mesh_pending.store(false, Ordering::Release);
    }

    /// Worker-side transition: mesh rebuild abandoned. The stale flag
    /// stays set so the next scheduling pass retries.
    pub fn clear_mesh_pending(&self) {
        self.flags.rebuild_mesh_pending.store(false, Ordering::Release);
    }

    /// Worker-side transition: lighting recomputed successfully.
    pub fn clear_lighting_dirty(&self) {
        self.flags
            .should_recalculate_lighting
            .store(false, Ordering::Release);
    }

    /// Worker-side transition: liquid rebuild completed successfully.
    pub fn clear_liquid_rebuilt(&self) {
        self.flags.should_rebuild_liquid.store(false, Ordering::Release);
        self.flags.rebuild_liquid_pending.store(false, Ordering::Release);
    }

    /// Worker-side transition: liquid rebuild failed for this chunk. The
    /// stale flag stays set so the next scheduling pass retries.
    pub fn clear_liquid_pending(&self) {
        self.flags.rebuild_liquid_pending.store(false, Ordering::Release);
    }

    // -- mutation -----------------------------------------------------------

    /// Sets the voxel type at `local`, updating health and the dirty
    /// flags. Returns the previous type, or `None` when `local` is out of
    /// bounds.
    ///
    /// A no-op write (same type) leaves flags and version untouched.
    pub fn set_voxel_type(&self, local: LocalCoord, id: VoxelTypeId) -> Option<VoxelTypeId> {
        if !local.in_bounds(self.dims) {
            tracing::warn!(
                "set_voxel_type out of bounds: ({}, {}, {}) in chunk {:?}",
                local.x,
                local.y,
                local.z,
                self.coord
            );
            return None;
        }

        let mut data = self.data.write();
        let old = data.type_at(local);
        if old == id {
            return Some(old);
        }
        data.set_type(local, id);
        data.set_health(local, if id.is_empty() { 0 } else { u8::MAX });
        drop(data);

        self.mark_mesh_dirty();
        self.mark_lighting_dirty();
        self.mark_ramps_dirty();
        self.version.fetch_add(1, Ordering::AcqRel);
        Some(old)
    }

    /// Clears the voxel at `local` and fires the destruction notification.
    /// Returns `true` if a non-empty voxel was actually removed.
    pub fn destroy_voxel(&self, local: LocalCoord, events: &ChunkEventBuffer) -> bool {
        match self.set_voxel_type(local, VoxelTypeId::EMPTY) {
            Some(old) if !old.is_empty() => {
                events.push(ChunkEvent::VoxelDestroyed {
                    chunk: self.coord,
                    local,
                });
                true
            }
            _ => false,
        }
    }

    /// Applies damage to the voxel at `local`; destroys it when health
    /// reaches zero. Returns `true` if the voxel was destroyed.
    pub fn apply_damage(&self, local: LocalCoord, amount: u8, events: &ChunkEventBuffer) -> bool {
        if !local.in_bounds(self.dims) {
            return false;
        }
        let mut data = self.data.write();
        if data.is_empty(local) {
            return false;
        }
        let health = data.health_at(local);
        if health > amount {
            data.set_health(local, health - amount);
            return false;
        }
        drop(data);
        self.destroy_voxel(local, events)
    }

    /// Marks the voxel at `local` explored and fires the exploration
    /// notification. Returns `true` on the first reveal only.
    pub fn mark_explored(&self, local: LocalCoord, events: &ChunkEventBuffer) -> bool {
        if !local.in_bounds(self.dims) {
            return false;
        }
        let already = self.data.write().set_explored(local);
        if already {
            return false;
        }
        // Lighting-only staleness never gets scheduled on its own; the
        // mesh flag is what carries the chunk into the rebuild queue.
        self.mark_lighting_dirty();
        self.mark_mesh_dirty();
        events.push(ChunkEvent::VoxelExplored {
            chunk: self.coord,
            local,
        });
        true
    }

    /// Sets the liquid state at `local` and marks the liquid mesh stale.
    pub fn set_water(&self, local: LocalCoord, state: WaterState) {
        if !local.in_bounds(self.dims) {
            return;
        }
        self.data.write().set_water(local, state);
        self.mark_liquid_dirty();
    }

    // -- ramps --------------------------------------------------------------

    /// Recomputes sloped-voxel hints for the whole chunk.
    ///
    /// Gated by the `reconstruct_ramps` flag: a call when the flag is
    /// clear is a no-op, so the mesh worker can invoke this once per cycle
    /// unconditionally. A solid, ramp-capable voxel with empty space above
    /// slopes up toward the first horizontal in-chunk neighbor (checked
    /// -X, +X, -Z, +Z) that is solid with solid above; anything else is a
    /// plain cube.
    pub fn update_ramps(&self, types: &VoxelTypeRegistry) {
        if !self.flags.reconstruct_ramps.swap(false, Ordering::AcqRel) {
            return;
        }

        let mut data = self.data.write();
        let dims = self.dims;
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let local = LocalCoord::new(x, y, z);
                    let id = data.type_at(local);
                    let ramp = if types.is_solid(id)
                        && types.is_ramp_capable(id)
                        && Self::above_is_open(&data, dims, x, y, z)
                    {
                        Self::ramp_toward_rise(&data, types, dims, x, y, z)
                    } else {
                        RampKind::None
                    };
                    data.set_ramp(local, ramp);
                }
            }
        }
    }

    /// True when the cell above `(x, y, z)` is empty or outside the chunk top.
    fn above_is_open(data: &VoxelData, dims: ChunkDims, x: usize, y: usize, z: usize) -> bool {
        y + 1 >= dims.y || data.is_empty(LocalCoord::new(x, y + 1, z))
    }

    /// Picks the slope direction for an exposed voxel: toward the first
    /// horizontal neighbor forming a rising step (solid with solid above).
    fn ramp_toward_rise(
        data: &VoxelData,
        types: &VoxelTypeRegistry,
        dims: ChunkDims,
        x: usize,
        y: usize,
        z: usize,
    ) -> RampKind {
        let candidates: [(i64, i64, RampKind); 4] = [
            (-1, 0, RampKind::NegX),
            (1, 0, RampKind::PosX),
            (0, -1, RampKind::NegZ),
            (0, 1, RampKind::PosZ),
        ];
        for (dx, dz, kind) in candidates {
            let nx = x as i64 + dx;
            let nz = z as i64 + dz;
            if nx < 0 || nz < 0 || nx >= dims.x as i64 || nz >= dims.z as i64 {
                continue;
            }
            let (nx, nz) = (nx as usize, nz as usize);
            let base = data.type_at(LocalCoord::new(nx, y, nz));
            if !types.is_solid(base) {
                continue;
            }
            if y + 1 < dims.y && types.is_solid(data.type_at(LocalCoord::new(nx, y + 1, nz))) {
                return kind;
            }
        }
        RampKind::None
    }

    // -- neighbors ----------------------------------------------------------

    /// Snapshot of the neighbor coordinates currently linked.
    pub fn neighbors(&self) -> Vec<ChunkCoord> {
        self.neighbors.lock().iter().copied().collect()
    }

    /// Links a neighbor coordinate. Self-links are rejected.
    pub fn add_neighbor(&self, coord: ChunkCoord) {
        if coord != self.coord {
            self.neighbors.lock().insert(coord);
        }
    }

    /// Unlinks a neighbor coordinate.
    pub fn remove_neighbor(&self, coord: ChunkCoord) {
        self.neighbors.lock().remove(&coord);
    }

    /// Drops every neighbor link.
    pub fn clear_neighbors(&self) {
        self.neighbors.lock().clear();
    }

    /// True iff `coord` is currently linked as a neighbor.
    pub fn has_neighbor(&self, coord: ChunkCoord) -> bool {
        self.neighbors.lock().contains(&coord)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
