//! Chunked voxel terrain storage for the strata terrain core.
//!
//! This crate owns the mutable world state: per-chunk flat voxel arrays
//! ([`VoxelData`]), the chunk wrapper with its rebuild-flag state machine
//! ([`VoxelChunk`]), and the authoritative coordinate→chunk registry
//! ([`ChunkRegistry`]) with its spatial queries (voxel resolution, ray
//! walking, box enumeration). Derived data (lighting, meshes) is computed
//! elsewhere; this crate tracks which of it is stale.

mod chunk;
mod events;
mod handle;
mod persist;
mod raycast;
mod registry;
mod rle;
mod serial;
mod storage;
mod types;

pub use chunk::VoxelChunk;
pub use events::{ChunkEvent, ChunkEventBuffer};
pub use handle::VoxelHandle;
pub use persist::{PersistError, default_save_dir, load_all_chunks, save_all_chunks};
pub use registry::{BodyId, ChunkRegistry, CollisionIndex, NullCollisionIndex};
pub use serial::{ChunkSerError, deserialize_chunk, serialize_chunk};
pub use storage::{RampKind, VertexColor, VoxelData, WaterKind, WaterState};
pub use types::{VoxelTypeDef, VoxelTypeError, VoxelTypeId, VoxelTypeRegistry};
