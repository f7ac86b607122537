//! Chunk persistence: one SVCK file per chunk coordinate.
//!
//! Saving walks the registry and writes every chunk; loading scans a
//! directory, reinserts every chunk it can read, then recomputes neighbor
//! tables and marks everything for an initial mesh/lighting pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::registry::ChunkRegistry;
use crate::serial::{ChunkSerError, deserialize_chunk, serialize_chunk};

/// Errors that can occur while saving or loading chunk files.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem access failed.
    #[error("chunk file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A chunk file had invalid contents.
    #[error("chunk file invalid: {0}")]
    Ser(#[from] ChunkSerError),
}

/// File extension used for chunk files.
const CHUNK_EXT: &str = "svck";

/// Default chunk directory under the platform data dir.
pub fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strata")
        .join("chunks")
}

fn chunk_file_name(coord: strata_math::ChunkCoord) -> String {
    format!("c.{}.{}.{}.{CHUNK_EXT}", coord.x, coord.y, coord.z)
}

/// Writes every chunk in the registry to `dir`, one file per coordinate.
///
/// Returns the number of chunks written. Existing files for the same
/// coordinates are overwritten; the directory is created if missing.
pub fn save_all_chunks(
    registry: &ChunkRegistry,
    dir: &Path,
    compress: bool,
) -> Result<usize, PersistError> {
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for chunk in registry.chunks() {
        let bytes = serialize_chunk(&chunk, compress);
        fs::write(dir.join(chunk_file_name(chunk.coord())), bytes)?;
        written += 1;
    }
    tracing::info!("saved {written} chunks to {}", dir.display());
    Ok(written)
}

/// Loads every chunk file in `dir` into the registry.
///
/// Chunks rejected by admission control (occupied coordinate, capacity)
/// are skipped with a warning. After loading, neighbor tables are rebuilt
/// and every loaded chunk is marked for an initial mesh/lighting pass —
/// sunlight and vertex colors are derived data and are not stored.
///
/// Returns the number of chunks inserted.
pub fn load_all_chunks(registry: &ChunkRegistry, dir: &Path) -> Result<usize, PersistError> {
    let mut loaded = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXT) {
            continue;
        }
        let bytes = fs::read(&path)?;
        let chunk = Arc::new(deserialize_chunk(&bytes)?);
        let coord = chunk.coord();
        if registry.add_chunk(Arc::clone(&chunk)) {
            loaded.push(chunk);
        } else {
            tracing::warn!("skipping chunk {coord:?} from {}: admission rejected", path.display());
        }
    }

    registry.recompute_neighbors();
    for chunk in &loaded {
        chunk.mark_mesh_dirty();
        chunk.mark_lighting_dirty();
        chunk.mark_ramps_dirty();
    }

    tracing::info!("loaded {} chunks from {}", loaded.len(), dir.display());
    Ok(loaded.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
