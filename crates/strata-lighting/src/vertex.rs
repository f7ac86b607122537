//! Per-vertex lighting: sun averaging, ambient occlusion, and emissive
//! override for every shared corner of a chunk's visible voxels.
//!
//! This is the single largest per-chunk cost in the rebuild pipeline,
//! which is why its invocation is gated by the dedicated lighting-dirty
//! flag rather than run on every mesh rebuild. Each corner shared by
//! several voxels is computed once per pass.

use std::sync::Arc;
use std::sync::LazyLock;

use glam::Vec3;
use strata_math::{ChunkDims, LocalCoord, corner_index, world_to_chunk, world_to_local};
use strata_voxel::{
    ChunkRegistry, VertexColor, VoxelChunk, VoxelData, VoxelTypeId, VoxelTypeRegistry,
};

/// For each of a voxel's 8 corners, the offsets (relative to the voxel)
/// of the 8 voxels sharing that corner vertex.
///
/// Corner `c` encodes its position bits as `(c & 1, c >> 1 & 1, c >> 2 & 1)`.
/// Built once before the workers start and immutable afterwards.
static VERTEX_SAMPLE_OFFSETS: LazyLock<[[(i32, i32, i32); 8]; 8]> = LazyLock::new(|| {
    let mut table = [[(0, 0, 0); 8]; 8];
    for (corner, offsets) in table.iter_mut().enumerate() {
        let cx = (corner & 1) as i32;
        let cy = ((corner >> 1) & 1) as i32;
        let cz = ((corner >> 2) & 1) as i32;
        let mut k = 0;
        for dz in -1..=0 {
            for dy in -1..=0 {
                for dx in -1..=0 {
                    offsets[k] = (cx + dx, cy + dy, cz + dz);
                    k += 1;
                }
            }
        }
    }
    table
});

/// One resolved voxel sample around a vertex.
struct CornerSample {
    voxel_type: VoxelTypeId,
    sun: u8,
    explored: bool,
}

/// Recomputes the vertex color array of one chunk.
///
/// For every visible solid voxel, each of its 8 corner vertices gets:
/// - `sun`: the average sun intensity of all sampled voxels sharing the
///   vertex,
/// - `ambient`: `255 × (1 − occluders / samples)` where occluders are the
///   sampled voxels that are solid or still unexplored,
/// - `dynamic`: 255 iff any sampled voxel emits light.
///
/// Visible non-solid voxels instead write the constant `fog` color to
/// their corners. Samples falling in an unloaded chunk are excluded from
/// both numerator and denominator. Visibility means the voxel's world Y
/// lies within the registry's revealed slice.
pub fn calculate_vertex_lighting(registry: &ChunkRegistry, chunk: &Arc<VoxelChunk>, fog: VertexColor) {
    let types = Arc::clone(registry.voxel_types());
    let dims = chunk.dims();
    let max_slice = registry.max_view_slice();
    let origin_y = chunk.origin().y as i32;

    let mut data = chunk.data().write();
    let mut seen = vec![false; dims.corner_volume()];

    // Pass 1: solid visible voxels get computed corners.
    for z in 0..dims.z {
        for y in 0..dims.y {
            if origin_y + y as i32 > max_slice {
                continue;
            }
            for x in 0..dims.x {
                let id = data.type_at(LocalCoord::new(x, y, z));
                if id.is_empty() || !types.is_solid(id) {
                    continue;
                }
                for corner in 0..8 {
                    let (cx, cy, cz) = corner_bits(corner);
                    let vi = corner_index(x + cx, y + cy, z + cz, dims);
                    if seen[vi] {
                        continue;
                    }
                    seen[vi] = true;
                    let color =
                        compute_corner(registry, chunk, &data, &types, dims, (x, y, z), corner);
                    data.set_vertex_color(x + cx, y + cy, z + cz, color);
                }
            }
        }
    }

    // Pass 2: visible non-solid voxels flood their remaining corners with
    // the fog-of-war constant; corners already owned by a solid voxel keep
    // their computed color.
    for z in 0..dims.z {
        for y in 0..dims.y {
            if origin_y + y as i32 > max_slice {
                continue;
            }
            for x in 0..dims.x {
                let id = data.type_at(LocalCoord::new(x, y, z));
                if id.is_empty() || types.is_solid(id) {
                    continue;
                }
                for corner in 0..8 {
                    let (cx, cy, cz) = corner_bits(corner);
                    let vi = corner_index(x + cx, y + cy, z + cz, dims);
                    if seen[vi] {
                        continue;
                    }
                    seen[vi] = true;
                    data.set_vertex_color(x + cx, y + cy, z + cz, fog);
                }
            }
        }
    }
}

fn corner_bits(corner: usize) -> (usize, usize, usize) {
    (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1)
}

/// Computes one vertex color from the up-to-8 voxels sharing the corner.
fn compute_corner(
    registry: &ChunkRegistry,
    chunk: &Arc<VoxelChunk>,
    own_data: &VoxelData,
    types: &VoxelTypeRegistry,
    dims: ChunkDims,
    voxel: (usize, usize, usize),
    corner: usize,
) -> VertexColor {
    let mut samples = 0u32;
    let mut sun_sum = 0u32;
    let mut occluders = 0u32;
    let mut emissive = false;

    for &(dx, dy, dz) in &VERTEX_SAMPLE_OFFSETS[corner] {
        let sx = voxel.0 as i64 + dx as i64;
        let sy = voxel.1 as i64 + dy as i64;
        let sz = voxel.2 as i64 + dz as i64;

        let Some(sample) = resolve_sample(registry, chunk, own_data, dims, sx, sy, sz) else {
            continue;
        };

        samples += 1;
        sun_sum += sample.sun as u32;
        if types.is_solid(sample.voxel_type) || !sample.explored {
            occluders += 1;
        }
        if types.emits_light(sample.voxel_type) {
            emissive = true;
        }
    }

    if samples == 0 {
        return VertexColor::default();
    }
    VertexColor {
        sun: (sun_sum / samples) as u8,
        ambient: ((255 * (samples - occluders)) / samples) as u8,
        dynamic: if emissive { 255 } else { 0 },
    }
}

/// Resolves one sample position, in-chunk or across a chunk boundary.
///
/// In-chunk positions read through the already-held write guard (the
/// chunk's own lock is not reentrant); out-of-chunk positions resolve the
/// neighboring chunk through the registry and take a read lock. Unloaded
/// positions yield `None`.
fn resolve_sample(
    registry: &ChunkRegistry,
    chunk: &Arc<VoxelChunk>,
    own_data: &VoxelData,
    dims: ChunkDims,
    sx: i64,
    sy: i64,
    sz: i64,
) -> Option<CornerSample> {
    let in_chunk = sx >= 0
        && sy >= 0
        && sz >= 0
        && (sx as usize) < dims.x
        && (sy as usize) < dims.y
        && (sz as usize) < dims.z;

    if in_chunk {
        let local = LocalCoord::new(sx as usize, sy as usize, sz as usize);
        return Some(CornerSample {
            voxel_type: own_data.type_at(local),
            sun: own_data.sun_at(local),
            explored: own_data.explored_at(local),
        });
    }

    let world = chunk.origin() + Vec3::new(sx as f32, sy as f32, sz as f32);
    let coord = world_to_chunk(world, dims);
    debug_assert_ne!(coord, chunk.coord());
    let neighbor = registry.get_chunk(coord)?;
    let local = world_to_local(neighbor.origin(), world, dims)?;
    let neighbor_data = neighbor.data().read();
    Some(CornerSample {
        voxel_type: neighbor_data.type_at(local),
        sun: neighbor_data.sun_at(local),
        explored: neighbor_data.explored_at(local),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunlight::{FULL_SUN, calculate_global_light};
    use strata_math::ChunkCoord;
    use strata_voxel::{NullCollisionIndex, VoxelTypeDef};

    const STONE: VoxelTypeId = VoxelTypeId(1);
    const LAMP: VoxelTypeId = VoxelTypeId(2);
    const MIST: VoxelTypeId = VoxelTypeId(3);

    const FOG: VertexColor = VertexColor {
        sun: 40,
        ambient: 40,
        dynamic: 0,
    };

    fn test_types() -> VoxelTypeRegistry {
        let mut reg = VoxelTypeRegistry::new();
        reg.register(VoxelTypeDef {
            name: "stone".to_string(),
            solid: true,
            light_emission: 0,
            ramp_capable: false,
        })
        .expect("register stone");
        reg.register(VoxelTypeDef {
            name: "lamp".to_string(),
            solid: true,
            light_emission: 200,
            ramp_capable: false,
        })
        .expect("register lamp");
        reg.register(VoxelTypeDef {
            name: "mist".to_string(),
            solid: false,
            light_emission: 0,
            ramp_capable: false,
        })
        .expect("register mist");
        reg
    }

    fn registry() -> (ChunkRegistry, Arc<VoxelChunk>) {
        let reg = ChunkRegistry::new(
            ChunkDims::new(8, 8, 8),
            64,
            Arc::new(test_types()),
            Arc::new(NullCollisionIndex),
        );
        let chunk = Arc::new(VoxelChunk::new(ChunkCoord::new(0, 0, 0), reg.dims()));
        assert!(reg.add_chunk(Arc::clone(&chunk)));
        (reg, chunk)
    }

    /// Reveals every voxel so occlusion comes from solidity alone.
    fn explore_all(chunk: &VoxelChunk) {
        let mut data = chunk.data().write();
        for z in 0..8 {
            for y in 0..8 {
                for x in 0..8 {
                    data.set_explored(LocalCoord::new(x, y, z));
                }
            }
        }
    }

    fn relight(reg: &ChunkRegistry, chunk: &Arc<VoxelChunk>) {
        let types = Arc::clone(reg.voxel_types());
        calculate_global_light(&mut chunk.data().write(), &types, true, 0);
        calculate_vertex_lighting(reg, chunk, FOG);
    }

    #[test]
    fn test_lone_voxel_corner_occlusion() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        chunk.set_voxel_type(LocalCoord::new(4, 4, 4), STONE);
        relight(&reg, &chunk);

        // A top corner of the lone voxel: 8 samples, only the voxel
        // itself is solid → ambient = 255 * 7/8.
        let data = chunk.data().read();
        let color = data.vertex_color_at(4, 5, 4);
        assert_eq!(color.ambient, (255 * 7 / 8) as u8);
        assert_eq!(color.dynamic, 0);
        // Everything above the floor level is in full sun.
        assert_eq!(color.sun, FULL_SUN);
    }

    #[test]
    fn test_buried_corner_fully_occluded() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        // A 2×2×2 solid block: its central vertex touches 8 solids.
        for z in 3..5 {
            for y in 3..5 {
                for x in 3..5 {
                    chunk.set_voxel_type(LocalCoord::new(x, y, z), STONE);
                }
            }
        }
        relight(&reg, &chunk);

        let data = chunk.data().read();
        let center = data.vertex_color_at(4, 4, 4);
        assert_eq!(center.ambient, 0, "vertex surrounded by 8 solids is black");
    }

    #[test]
    fn test_unexplored_neighbors_count_as_occluders() {
        let (reg, chunk) = registry();
        // No explore_all: everything starts unexplored.
        chunk.set_voxel_type(LocalCoord::new(4, 4, 4), STONE);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        let color = data.vertex_color_at(4, 5, 4);
        assert_eq!(color.ambient, 0, "unexplored surroundings occlude fully");
    }

    #[test]
    fn test_emissive_neighbor_forces_dynamic() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        chunk.set_voxel_type(LocalCoord::new(4, 4, 4), STONE);
        chunk.set_voxel_type(LocalCoord::new(5, 4, 4), LAMP);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        // The shared vertex between the stone and the lamp.
        let shared = data.vertex_color_at(5, 5, 4);
        assert_eq!(shared.dynamic, 255);
        // A far corner of the stone, untouched by the lamp.
        let far = data.vertex_color_at(4, 5, 4);
        assert_eq!(far.dynamic, 0);
    }

    #[test]
    fn test_non_solid_visible_voxel_writes_fog() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        chunk.set_voxel_type(LocalCoord::new(2, 2, 2), MIST);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        assert_eq!(data.vertex_color_at(2, 2, 2), FOG);
        assert_eq!(data.vertex_color_at(3, 3, 3), FOG);
    }

    #[test]
    fn test_solid_corner_wins_over_fog() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        // Mist directly above stone: the shared corners belong to the stone.
        chunk.set_voxel_type(LocalCoord::new(2, 2, 2), STONE);
        chunk.set_voxel_type(LocalCoord::new(2, 3, 2), MIST);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        let shared = data.vertex_color_at(2, 3, 2);
        assert_ne!(shared, FOG, "computed solid corner is not overwritten by fog");
        // The mist's top corners are fog.
        assert_eq!(data.vertex_color_at(2, 4, 2), FOG);
    }

    #[test]
    fn test_voxels_above_view_slice_are_skipped() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        chunk.set_voxel_type(LocalCoord::new(4, 6, 4), STONE);
        reg.set_max_view_slice(3);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        assert_eq!(
            data.vertex_color_at(4, 7, 4),
            VertexColor::default(),
            "hidden voxel contributes no vertex colors"
        );
    }

    #[test]
    fn test_boundary_corner_samples_neighbor_chunk() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        // Neighbor chunk with a solid wall against the shared face.
        let neighbor = Arc::new(VoxelChunk::new(ChunkCoord::new(1, 0, 0), reg.dims()));
        assert!(reg.add_chunk(Arc::clone(&neighbor)));
        explore_all(&neighbor);
        for z in 0..8 {
            for y in 0..8 {
                neighbor.set_voxel_type(LocalCoord::new(0, y, z), STONE);
            }
        }

        chunk.set_voxel_type(LocalCoord::new(7, 4, 4), STONE);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        // Corner on the shared face: 4 of its 8 samples live in the
        // neighbor's wall, plus the voxel itself → 5 occluders.
        let face = data.vertex_color_at(8, 5, 4);
        assert_eq!(face.ambient, (255 * 3 / 8) as u8);
        // Opposite corner, fully inside the chunk: only the voxel occludes.
        let inner = data.vertex_color_at(7, 5, 4);
        assert_eq!(inner.ambient, (255 * 7 / 8) as u8);
    }

    #[test]
    fn test_missing_neighbor_samples_are_excluded() {
        let (reg, chunk) = registry();
        explore_all(&chunk);
        // Voxel on the -X face; the (-1, 0, 0) chunk is not loaded.
        chunk.set_voxel_type(LocalCoord::new(0, 4, 4), STONE);
        relight(&reg, &chunk);

        let data = chunk.data().read();
        // Face corner at x=0: only 4 of 8 sample positions are loaded;
        // one of those (the voxel) is solid → ambient = 255 * 3/4.
        let color = data.vertex_color_at(0, 5, 4);
        assert_eq!(color.ambient, (255 * 3 / 4) as u8);
    }
}
