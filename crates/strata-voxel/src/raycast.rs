//! Rasterized line-of-sight queries over the voxel grid.
//!
//! Walks the cells a segment passes through in ray order (Amanatides–Woo
//! grid traversal) and stops at the first voxel that is both non-empty and
//! within the revealed viewing slice. Used for picking and occlusion
//! tests.

use std::sync::Arc;

use glam::Vec3;

use crate::chunk::VoxelChunk;
use crate::handle::VoxelHandle;
use crate::registry::ChunkRegistry;

impl ChunkRegistry {
    /// First visible voxel along the segment from `start` to `end`.
    ///
    /// A voxel is visible when it is non-empty and its world Y lies within
    /// the current viewing slice. The voxel at the smallest ray parameter
    /// wins. With `select_empty`, the empty voxel immediately *before* the
    /// hit is returned instead (or `None` when there is no such resolved
    /// cell — the hit sits at the segment start or the cell's chunk is
    /// unloaded). Unloaded cells along the way are skipped, never hits.
    pub fn first_visible_voxel_along_ray(
        &self,
        start: Vec3,
        end: Vec3,
        select_empty: bool,
    ) -> Option<VoxelHandle> {
        let dir = end - start;

        let mut cell = [
            start.x.floor() as i64,
            start.y.floor() as i64,
            start.z.floor() as i64,
        ];
        let end_cell = [
            end.x.floor() as i64,
            end.y.floor() as i64,
            end.z.floor() as i64,
        ];

        let step = [signum(dir.x), signum(dir.y), signum(dir.z)];

        // Parameter t runs 0..=1 over the segment. t_max holds, per axis,
        // the t at which the walk crosses the next cell boundary; t_delta
        // the t spanned by one whole cell.
        let mut t_max = [
            boundary_t(start.x, dir.x, cell[0]),
            boundary_t(start.y, dir.y, cell[1]),
            boundary_t(start.z, dir.z, cell[2]),
        ];
        let t_delta = [
            if dir.x != 0.0 { (1.0 / dir.x).abs() } else { f32::INFINITY },
            if dir.y != 0.0 { (1.0 / dir.y).abs() } else { f32::INFINITY },
            if dir.z != 0.0 { (1.0 / dir.z).abs() } else { f32::INFINITY },
        ];

        let mut hint: Option<Arc<VoxelChunk>> = None;
        let mut prev_empty: Option<VoxelHandle> = None;

        loop {
            let world = Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32);
            let handle = self.get_voxel(world, hint.as_ref());
            if let Some(handle) = handle {
                hint = Some(Arc::clone(handle.chunk()));
                if !handle.is_empty() && self.is_visible_y(cell[1] as i32) {
                    return if select_empty { prev_empty } else { Some(handle) };
                }
                if handle.is_empty() {
                    prev_empty = Some(handle);
                }
            }

            if cell == end_cell {
                return None;
            }

            // Advance into the cell with the nearest boundary crossing.
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            if t_max[axis] > 1.0 {
                // The segment ends before the next boundary; the end cell
                // was already inspected or is unreachable.
                return None;
            }
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];
        }
    }
}

/// Integer step direction for one axis.
fn signum(v: f32) -> i64 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Parameter t at which the walk leaves the starting cell along one axis.
fn boundary_t(origin: f32, dir: f32, cell: i64) -> f32 {
    if dir > 0.0 {
        ((cell + 1) as f32 - origin) / dir
    } else if dir < 0.0 {
        (cell as f32 - origin) / dir
    } else {
        f32::INFINITY
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
