//! Coordinate math for the strata terrain core.
//!
//! Pure conversion functions between the three addressing schemes used by
//! the rest of the workspace — world position, chunk coordinate, and
//! chunk-local grid position — plus the flat linear/corner index math and
//! a world-space AABB.

mod aabb;
mod coords;

pub use aabb::Aabb;
pub use coords::{
    ChunkCoord, ChunkDims, LocalCoord, XZ_NEIGHBOR_OFFSETS, chunk_origin, corner_index,
    linear_to_local, local_to_linear, world_to_chunk, world_to_local,
};
