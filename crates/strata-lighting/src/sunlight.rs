//! Global sunlight: per-column ray casting from the chunk top.

use strata_math::LocalCoord;
use strata_voxel::{VoxelData, VoxelTypeRegistry};

/// Maximum sunlight intensity.
pub const FULL_SUN: u8 = 255;

/// Recomputes the sun array of one chunk.
///
/// With sunlight enabled, every (x, z) column is cast downward from the
/// top of the chunk: each non-solid voxel above the first solid voxel
/// receives [`FULL_SUN`], the first solid voxel itself receives
/// [`FULL_SUN`], and everything below it keeps the reset value of 0.
/// With sunlight disabled the whole chunk is flooded with `fallback`.
pub fn calculate_global_light(
    data: &mut VoxelData,
    types: &VoxelTypeRegistry,
    sunlight_enabled: bool,
    fallback: u8,
) {
    if !sunlight_enabled {
        data.fill_sun(fallback);
        return;
    }

    data.fill_sun(0);
    let dims = data.dims();
    for z in 0..dims.z {
        for x in 0..dims.x {
            for y in (0..dims.y).rev() {
                let local = LocalCoord::new(x, y, z);
                data.set_sun(local, FULL_SUN);
                if types.is_solid(data.type_at(local)) {
                    break;
                }
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
    use strata_math::ChunkDims;
    use strata_voxel::{VoxelTypeDef, VoxelTypeId};

    const STONE: VoxelTypeId = VoxelTypeId(1);

    fn test_types() -> VoxelTypeRegistry {
        let mut reg = VoxelTypeRegistry::new();
        reg.register(VoxelTypeDef {
            name: "stone".to_string(),
            solid: true,
            light_emission: 0,
            ramp_capable: false,
        })
        .expect("register stone");
        reg
    }

    #[test]
    fn test_single_solid_voxel_column() {
        let types = test_types();
        let mut data = VoxelData::new(ChunkDims::new(4, 4, 4));
        data.set_type(LocalCoord::new(2, 1, 2), STONE);

        calculate_global_light(&mut data, &types, true, 0);

        // Above the solid voxel: full sun.
        assert_eq!(data.sun_at(LocalCoord::new(2, 3, 2)), FULL_SUN);
        assert_eq!(data.sun_at(LocalCoord::new(2, 2, 2)), FULL_SUN);
        // The first solid voxel itself: full sun.
        assert_eq!(data.sun_at(LocalCoord::new(2, 1, 2)), FULL_SUN);
        // Below it: untouched reset value.
        assert_eq!(data.sun_at(LocalCoord::new(2, 0, 2)), 0);

        // An unobstructed column is fully lit.
        for y in 0..4 {
            assert_eq!(data.sun_at(LocalCoord::new(0, y, 0)), FULL_SUN);
        }
    }

    #[test]
    fn test_solid_at_top_shadows_whole_column() {
        let types = test_types();
        let mut data = VoxelData::new(ChunkDims::new(4, 4, 4));
        data.set_type(LocalCoord::new(1, 3, 1), STONE);

        calculate_global_light(&mut data, &types, true, 0);

        assert_eq!(data.sun_at(LocalCoord::new(1, 3, 1)), FULL_SUN);
        for y in 0..3 {
            assert_eq!(data.sun_at(LocalCoord::new(1, y, 1)), 0, "shadowed at y={y}");
        }
    }

    #[test]
    fn test_recompute_clears_stale_values() {
        let types = test_types();
        let mut data = VoxelData::new(ChunkDims::new(4, 4, 4));
        data.set_type(LocalCoord::new(2, 2, 2), STONE);
        calculate_global_light(&mut data, &types, true, 0);
        assert_eq!(data.sun_at(LocalCoord::new(2, 1, 2)), 0);

        // Removing the blocker and recomputing relights the column.
        data.set_type(LocalCoord::new(2, 2, 2), VoxelTypeId::EMPTY);
        calculate_global_light(&mut data, &types, true, 0);
        assert_eq!(data.sun_at(LocalCoord::new(2, 1, 2)), FULL_SUN);
        assert_eq!(data.sun_at(LocalCoord::new(2, 0, 2)), FULL_SUN);
    }

    #[test]
    fn test_disabled_sunlight_floods_constant() {
        let types = test_types();
        let mut data = VoxelData::new(ChunkDims::new(4, 4, 4));
        data.set_type(LocalCoord::new(2, 3, 2), STONE);

        calculate_global_light(&mut data, &types, false, 120);

        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(data.sun_at(LocalCoord::new(x, y, z)), 120);
                }
            }
        }
    }
}
