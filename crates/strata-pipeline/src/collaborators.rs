//! Boundary traits for the external collaborators the pipeline drives.
//!
//! The pipeline owns scheduling and dirty-flag bookkeeping; the actual
//! terrain content, GPU mesh construction, and liquid physics live behind
//! these traits and are injected at construction. All implementations are
//! shared across worker threads.

use strata_math::{ChunkCoord, ChunkDims};
use strata_voxel::{ChunkRegistry, VoxelChunk};
use thiserror::Error;

/// Failure of a mesh or liquid-mesh construction attempt.
///
/// The pipeline logs these and retries on a later scheduling pass; they
/// never surface to the simulation loop.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The builder could not produce geometry for this chunk.
    #[error("mesh construction failed: {0}")]
    Failed(String),
    /// Required GPU or buffer resources were unavailable.
    #[error("mesh resources unavailable: {0}")]
    ResourcesUnavailable(String),
}

/// Produces the voxel content of freshly requested chunks.
///
/// Pure with respect to the registry: generation must not call back into
/// it. The pipeline inserts the result on the owner thread.
pub trait TerrainGenerator: Send + Sync {
    /// Generates the chunk at `coord` with its least corner at `origin`.
    fn generate(&self, coord: ChunkCoord, origin: glam::Vec3, dims: ChunkDims) -> VoxelChunk;
}

/// Builds the render geometry of a chunk from its current voxel data.
pub trait MeshBuilder: Send + Sync {
    /// Rebuilds the chunk's mesh. Called from the mesh worker with
    /// lighting already up to date.
    fn build_mesh(&self, chunk: &VoxelChunk) -> Result<(), MeshError>;
}

/// Builds the liquid surface geometry of a chunk.
pub trait LiquidMesher: Send + Sync {
    /// Rebuilds the chunk's liquid surface mesh.
    fn build_liquid_mesh(&self, chunk: &VoxelChunk) -> Result<(), MeshError>;
}

/// The external liquid-flow simulation.
///
/// Each tick may mutate per-voxel water state directly through the
/// registry and is responsible for calling
/// [`VoxelChunk::mark_liquid_dirty`] on every chunk it touches.
pub trait WaterSimulation: Send + Sync {
    /// Advances the simulation by one tick.
    fn advance_tick(&self, registry: &ChunkRegistry);
}
