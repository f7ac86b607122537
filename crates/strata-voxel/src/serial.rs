//! Binary serialization for chunk files.
//!
//! The SVCK (Strata Voxel Chunk) format is a compact, versioned binary
//! format written one file per chunk coordinate.
//!
//! ## Binary layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `[0x53, 0x56, 0x43, 0x4B]` ("SVCK") |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 12 | Chunk coordinate (3 × `i32`, little-endian) |
//! | 17 | 12 | Chunk dimensions (3 × `u32`, little-endian) |
//! | 29 | 1 | Flags (`u8`, bit 0 = run-length compressed sections) |
//! | 30 | — | Sections: types, health, ramps, explored, water level, water kind |
//!
//! Raw sections store the type array as `u16` little-endian and the rest
//! as one byte per voxel; compressed sections use the run-length codec.
//! Sunlight and vertex colors are derived data and are not persisted —
//! loading marks the chunk for a full lighting pass instead.

use strata_math::{ChunkCoord, ChunkDims};
use thiserror::Error;

use crate::chunk::VoxelChunk;
use crate::rle::{self, RleError};
use crate::storage::{RampKind, VoxelData, WaterKind};
use crate::types::VoxelTypeId;

/// Magic bytes identifying the SVCK format.
const MAGIC: [u8; 4] = [0x53, 0x56, 0x43, 0x4B];

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Header length up to and including the flags byte.
const HEADER_LEN: usize = 30;

/// Flag bit: sections are run-length compressed.
const FLAG_COMPRESSED: u8 = 0b0000_0001;

/// Errors that can occur during chunk deserialization.
#[derive(Debug, Error)]
pub enum ChunkSerError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported chunk format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than its header or sections require.
    #[error("chunk data truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count available.
        actual: usize,
    },
    /// A dimension field is zero or implausibly large.
    #[error("invalid chunk dimensions {0}x{1}x{2}")]
    InvalidDims(u32, u32, u32),
    /// A run-length section failed to decode.
    #[error("run-length section invalid: {0}")]
    Rle(#[from] RleError),
}

/// Serializes a chunk to the SVCK binary format.
///
/// `compress` selects run-length coding for the payload sections, which
/// collapses the long uniform runs typical of terrain.
pub fn serialize_chunk(chunk: &VoxelChunk, compress: bool) -> Vec<u8> {
    let data = chunk.data().read();
    let coord = chunk.coord();
    let dims = chunk.dims();

    let mut buf = Vec::with_capacity(HEADER_LEN + data.voxel_count() * 2);
    buf.extend_from_slice(&MAGIC);
    buf.push(FORMAT_VERSION);
    for v in [coord.x, coord.y, coord.z] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for v in [dims.x as u32, dims.y as u32, dims.z as u32] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.push(if compress { FLAG_COMPRESSED } else { 0 });

    let types = data.types().iter().map(|t| t.0);
    let health = data.health().iter().map(|&h| h as u16);
    let ramps = data.ramps().iter().map(|&r| r as u16);
    let explored = data.explored().iter().map(|&e| e as u16);
    let water_level = data.water().iter().map(|w| w.level as u16);
    let water_kind = data.water().iter().map(|w| w.kind as u16);

    if compress {
        rle::encode_section(types, &mut buf);
        rle::encode_section(health, &mut buf);
        rle::encode_section(ramps, &mut buf);
        rle::encode_section(explored, &mut buf);
        rle::encode_section(water_level, &mut buf);
        rle::encode_section(water_kind, &mut buf);
    } else {
        for t in types {
            buf.extend_from_slice(&t.to_le_bytes());
        }
        buf.extend(health.map(|v| v as u8));
        buf.extend(ramps.map(|v| v as u8));
        buf.extend(explored.map(|v| v as u8));
        buf.extend(water_level.map(|v| v as u8));
        buf.extend(water_kind.map(|v| v as u8));
    }

    buf
}

/// Deserializes a chunk from the SVCK binary format.
///
/// The returned chunk has clean rebuild flags; callers reinserting loaded
/// chunks are responsible for the initial mesh/lighting dirty pass.
pub fn deserialize_chunk(data: &[u8]) -> Result<VoxelChunk, ChunkSerError> {
    if data.len() < 4 {
        return Err(ChunkSerError::InvalidMagic);
    }
    if data[0..4] != MAGIC {
        return Err(ChunkSerError::InvalidMagic);
    }
    if data.len() < HEADER_LEN {
        return Err(ChunkSerError::Truncated {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }
    let version = data[4];
    if version != FORMAT_VERSION {
        return Err(ChunkSerError::UnsupportedVersion(version));
    }

    let read_i32 = |off: usize| i32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);
    let read_u32 = |off: usize| u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);

    let coord = ChunkCoord::new(read_i32(5), read_i32(9), read_i32(13));
    let (dx, dy, dz) = (read_u32(17), read_u32(21), read_u32(25));
    // Cap each axis so a corrupted header cannot demand absurd allocations.
    const MAX_AXIS: u32 = 1024;
    if dx == 0 || dy == 0 || dz == 0 || dx > MAX_AXIS || dy > MAX_AXIS || dz > MAX_AXIS {
        return Err(ChunkSerError::InvalidDims(dx, dy, dz));
    }
    let dims = ChunkDims::new(dx as usize, dy as usize, dz as usize);
    let n = dims.volume();
    let compressed = data[29] & FLAG_COMPRESSED != 0;

    let mut payload = VoxelData::new(dims);
    let body = &data[HEADER_LEN..];

    if compressed {
        let mut offset = 0;
        let mut next = |expected: usize| -> Result<Vec<u16>, ChunkSerError> {
            let (values, consumed) = rle::decode_section(&body[offset..], expected)?;
            offset += consumed;
            Ok(values)
        };
        let types = next(n)?;
        let health = next(n)?;
        let ramps = next(n)?;
        let explored = next(n)?;
        let water_level = next(n)?;
        let water_kind = next(n)?;
        fill_payload(
            &mut payload,
            &types,
            &health,
            &ramps,
            &explored,
            &water_level,
            &water_kind,
        );
    } else {
        let expected = n * 2 + n * 5;
        if body.len() < expected {
            return Err(ChunkSerError::Truncated {
                expected: HEADER_LEN + expected,
                actual: data.len(),
            });
        }
        let types: Vec<u16> = body[..n * 2]
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        let bytes = &body[n * 2..];
        let section = |i: usize| bytes[i * n..(i + 1) * n].iter().map(|&b| b as u16);
        fill_payload(
            &mut payload,
            &types,
            &section(0).collect::<Vec<_>>(),
            &section(1).collect::<Vec<_>>(),
            &section(2).collect::<Vec<_>>(),
            &section(3).collect::<Vec<_>>(),
            &section(4).collect::<Vec<_>>(),
        );
    }

    Ok(VoxelChunk::from_data(coord, payload))
}

/// Writes decoded sections into the payload arrays. All slices have
/// voxel-count length by the time this runs.
fn fill_payload(
    payload: &mut VoxelData,
    types: &[u16],
    health: &[u16],
    ramps: &[u16],
    explored: &[u16],
    water_level: &[u16],
    water_kind: &[u16],
) {
    for (slot, &t) in payload.types_mut().iter_mut().zip(types) {
        *slot = VoxelTypeId(t);
    }
    for (slot, &h) in payload.health_mut().iter_mut().zip(health) {
        *slot = h as u8;
    }
    for (slot, &r) in payload.ramps_mut().iter_mut().zip(ramps) {
        *slot = RampKind::from_u8(r as u8);
    }
    for (slot, &e) in payload.explored_mut().iter_mut().zip(explored) {
        *slot = e != 0;
    }
    for (slot, (&level, &kind)) in payload
        .water_mut()
        .iter_mut()
        .zip(water_level.iter().zip(water_kind))
    {
        slot.level = level as u8;
        slot.kind = WaterKind::from_u8(kind as u8);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::WaterState;
    use strata_math::LocalCoord;

    fn sample_chunk() -> VoxelChunk {
        let chunk = VoxelChunk::new(ChunkCoord::new(3, -1, 7), ChunkDims::new(8, 8, 8));
        chunk.set_voxel_type(LocalCoord::new(0, 0, 0), VoxelTypeId(1));
        chunk.set_voxel_type(LocalCoord::new(7, 7, 7), VoxelTypeId(2));
        chunk.set_voxel_type(LocalCoord::new(3, 4, 5), VoxelTypeId(300));
        {
            let mut data = chunk.data().write();
            data.set_health(LocalCoord::new(3, 4, 5), 17);
            data.set_ramp(LocalCoord::new(0, 0, 0), RampKind::NegZ);
            data.set_explored(LocalCoord::new(1, 2, 3));
            data.set_water(
                LocalCoord::new(2, 2, 2),
                WaterState {
                    level: 9,
                    kind: WaterKind::Flowing,
                },
            );
        }
        chunk
    }

    fn assert_payload_equal(a: &VoxelChunk, b: &VoxelChunk) {
        assert_eq!(a.coord(), b.coord());
        assert_eq!(a.dims(), b.dims());
        let da = a.data().read();
        let db = b.data().read();
        assert_eq!(da.types(), db.types());
        assert_eq!(da.health(), db.health());
        assert_eq!(da.ramps(), db.ramps());
        assert_eq!(da.explored(), db.explored());
        assert_eq!(da.water(), db.water());
    }

    #[test]
    fn test_roundtrip_uncompressed() {
        let chunk = sample_chunk();
        let bytes = serialize_chunk(&chunk, false);
        let restored = deserialize_chunk(&bytes).expect("deserialize");
        assert_payload_equal(&chunk, &restored);
    }

    #[test]
    fn test_roundtrip_compressed() {
        let chunk = sample_chunk();
        let bytes = serialize_chunk(&chunk, true);
        let restored = deserialize_chunk(&bytes).expect("deserialize");
        assert_payload_equal(&chunk, &restored);
    }

    #[test]
    fn test_compression_shrinks_sparse_chunks() {
        let chunk = sample_chunk();
        let raw = serialize_chunk(&chunk, false);
        let packed = serialize_chunk(&chunk, true);
        assert!(
            packed.len() < raw.len() / 4,
            "sparse chunk should compress well: {} vs {}",
            packed.len(),
            raw.len()
        );
    }

    #[test]
    fn test_restored_chunk_has_clean_flags() {
        let bytes = serialize_chunk(&sample_chunk(), true);
        let restored = deserialize_chunk(&bytes).expect("deserialize");
        assert!(!restored.mesh_dirty());
        assert!(!restored.lighting_dirty());
        assert_eq!(restored.version(), 0);
    }

    #[test]
    fn test_invalid_magic_rejected() {
        assert!(matches!(
            deserialize_chunk(&[0xFF, 0xFF]),
            Err(ChunkSerError::InvalidMagic)
        ));
        let mut bytes = serialize_chunk(&sample_chunk(), false);
        bytes[0] = 0;
        assert!(matches!(
            deserialize_chunk(&bytes),
            Err(ChunkSerError::InvalidMagic)
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = serialize_chunk(&sample_chunk(), false);
        bytes[4] = 99;
        assert!(matches!(
            deserialize_chunk(&bytes),
            Err(ChunkSerError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_truncated_data_rejected() {
        let bytes = serialize_chunk(&sample_chunk(), false);
        assert!(matches!(
            deserialize_chunk(&bytes[..HEADER_LEN - 1]),
            Err(ChunkSerError::Truncated { .. })
        ));
        assert!(matches!(
            deserialize_chunk(&bytes[..bytes.len() - 10]),
            Err(ChunkSerError::Truncated { .. })
        ));
    }

    #[test]
    fn test_corrupt_dims_rejected() {
        let mut bytes = serialize_chunk(&sample_chunk(), false);
        bytes[17..21].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            deserialize_chunk(&bytes),
            Err(ChunkSerError::InvalidDims(0, 8, 8))
        ));
    }

    #[test]
    fn test_truncated_compressed_section_rejected() {
        let bytes = serialize_chunk(&sample_chunk(), true);
        let result = deserialize_chunk(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(ChunkSerError::Rle(_))));
    }
}
