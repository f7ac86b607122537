//! Flat parallel-array voxel storage for one chunk.
//!
//! Every array except `vertex_colors` is indexed by the same linear index
//! (see [`strata_math::local_to_linear`]); `vertex_colors` holds one entry
//! per shared corner vertex over the `(dims + 1)` grid. Out-of-bounds
//! access is handled gracefully without panics: reads return defaults with
//! a warning log, writes are ignored.

use strata_math::{ChunkDims, LocalCoord, corner_index, local_to_linear};

use crate::types::VoxelTypeId;

/// Sloped-geometry hint for a single voxel, recomputed per mesh cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum RampKind {
    /// Plain cube, no slope.
    #[default]
    None = 0,
    /// Slopes up toward -X.
    NegX = 1,
    /// Slopes up toward +X.
    PosX = 2,
    /// Slopes up toward -Z.
    NegZ = 3,
    /// Slopes up toward +Z.
    PosZ = 4,
}

impl RampKind {
    /// Decodes a serialized ramp byte. Unknown values decode to `None`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => RampKind::NegX,
            2 => RampKind::PosX,
            3 => RampKind::NegZ,
            4 => RampKind::PosZ,
            _ => RampKind::None,
        }
    }
}

/// Liquid category of a water cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum WaterKind {
    /// No liquid present.
    #[default]
    None = 0,
    /// Standing water.
    Still = 1,
    /// Flowing water (has a current direction in the simulation).
    Flowing = 2,
}

impl WaterKind {
    /// Decodes a serialized water-kind byte. Unknown values decode to `None`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => WaterKind::Still,
            2 => WaterKind::Flowing,
            _ => WaterKind::None,
        }
    }
}

/// Per-voxel liquid state, owned by the water simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaterState {
    /// Fill level, 0 (dry) to 255 (full).
    pub level: u8,
    /// Liquid category.
    pub kind: WaterKind,
}

/// Lighting color of a shared corner vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexColor {
    /// Averaged sunlight intensity of the voxels sharing the vertex.
    pub sun: u8,
    /// Ambient-occlusion brightness (255 = fully exposed).
    pub ambient: u8,
    /// Dynamic light contribution (255 when an emissive voxel touches the vertex).
    pub dynamic: u8,
}

/// The owned voxel payload of one chunk: parallel flat arrays plus the
/// corner-indexed vertex color array.
///
/// A voxel is empty iff its type is [`VoxelTypeId::EMPTY`].
#[derive(Clone, Debug)]
pub struct VoxelData {
    dims: ChunkDims,
    types: Vec<VoxelTypeId>,
    health: Vec<u8>,
    ramps: Vec<RampKind>,
    sun: Vec<u8>,
    explored: Vec<bool>,
    water: Vec<WaterState>,
    vertex_colors: Vec<VertexColor>,
}

impl VoxelData {
    /// Creates an all-empty payload for the given dimensions.
    pub fn new(dims: ChunkDims) -> Self {
        let n = dims.volume();
        Self {
            dims,
            types: vec![VoxelTypeId::EMPTY; n],
            health: vec![0; n],
            ramps: vec![RampKind::None; n],
            sun: vec![0; n],
            explored: vec![false; n],
            water: vec![WaterState::default(); n],
            vertex_colors: vec![VertexColor::default(); dims.corner_volume()],
        }
    }

    /// Chunk dimensions this payload was sized for.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Number of voxel slots.
    pub fn voxel_count(&self) -> usize {
        self.types.len()
    }

    fn index(&self, local: LocalCoord) -> Option<usize> {
        if local.in_bounds(self.dims) {
            Some(local_to_linear(local, self.dims))
        } else {
            tracing::warn!(
                "voxel access out of bounds: ({}, {}, {})",
                local.x,
                local.y,
                local.z
            );
            None
        }
    }

    /// Voxel type at `local`. Out of bounds reads as empty.
    pub fn type_at(&self, local: LocalCoord) -> VoxelTypeId {
        self.index(local).map_or(VoxelTypeId::EMPTY, |i| self.types[i])
    }

    /// Sets the voxel type at `local`. Out of bounds is ignored.
    pub fn set_type(&mut self, local: LocalCoord, id: VoxelTypeId) {
        if let Some(i) = self.index(local) {
            self.types[i] = id;
        }
    }

    /// True iff the voxel at `local` is empty (or out of bounds).
    pub fn is_empty(&self, local: LocalCoord) -> bool {
        self.type_at(local).is_empty()
    }

    /// Voxel health at `local` (0 when out of bounds).
    pub fn health_at(&self, local: LocalCoord) -> u8 {
        self.index(local).map_or(0, |i| self.health[i])
    }

    /// Sets voxel health at `local`.
    pub fn set_health(&mut self, local: LocalCoord, health: u8) {
        if let Some(i) = self.index(local) {
            self.health[i] = health;
        }
    }

    /// Ramp hint at `local`.
    pub fn ramp_at(&self, local: LocalCoord) -> RampKind {
        self.index(local).map_or(RampKind::None, |i| self.ramps[i])
    }

    /// Sets the ramp hint at `local`.
    pub fn set_ramp(&mut self, local: LocalCoord, ramp: RampKind) {
        if let Some(i) = self.index(local) {
            self.ramps[i] = ramp;
        }
    }

    /// Sunlight intensity at `local` (0 when out of bounds).
    pub fn sun_at(&self, local: LocalCoord) -> u8 {
        self.index(local).map_or(0, |i| self.sun[i])
    }

    /// Sets sunlight intensity at `local`.
    pub fn set_sun(&mut self, local: LocalCoord, value: u8) {
        if let Some(i) = self.index(local) {
            self.sun[i] = value;
        }
    }

    /// Overwrites the whole sunlight array with `value`.
    pub fn fill_sun(&mut self, value: u8) {
        self.sun.fill(value);
    }

    /// Whether the voxel at `local` has been revealed to the player.
    pub fn explored_at(&self, local: LocalCoord) -> bool {
        self.index(local).is_some_and(|i| self.explored[i])
    }

    /// Marks the voxel at `local` explored. Returns the previous value.
    pub fn set_explored(&mut self, local: LocalCoord) -> bool {
        match self.index(local) {
            Some(i) => std::mem::replace(&mut self.explored[i], true),
            None => false,
        }
    }

    /// Liquid state at `local`.
    pub fn water_at(&self, local: LocalCoord) -> WaterState {
        self.index(local).map_or(WaterState::default(), |i| self.water[i])
    }

    /// Sets the liquid state at `local`.
    pub fn set_water(&mut self, local: LocalCoord, state: WaterState) {
        if let Some(i) = self.index(local) {
            self.water[i] = state;
        }
    }

    /// Vertex color at corner `(x, y, z)` of the `(dims + 1)` corner grid.
    pub fn vertex_color_at(&self, x: usize, y: usize, z: usize) -> VertexColor {
        if x <= self.dims.x && y <= self.dims.y && z <= self.dims.z {
            self.vertex_colors[corner_index(x, y, z, self.dims)]
        } else {
            tracing::warn!("corner access out of bounds: ({x}, {y}, {z})");
            VertexColor::default()
        }
    }

    /// Sets the vertex color at corner `(x, y, z)`.
    pub fn set_vertex_color(&mut self, x: usize, y: usize, z: usize, color: VertexColor) {
        if x <= self.dims.x && y <= self.dims.y && z <= self.dims.z {
            let i = corner_index(x, y, z, self.dims);
            self.vertex_colors[i] = color;
        } else {
            tracing::warn!("corner write out of bounds: ({x}, {y}, {z})");
        }
    }

    // Raw slice views for index-based hot loops (lighting, serialization).
    // Indexing contract is the caller's: same linear index across all
    // voxel-count slices.

    /// All voxel types, linear-indexed.
    pub fn types(&self) -> &[VoxelTypeId] {
        &self.types
    }

    /// Mutable voxel types, linear-indexed. Deserialization only: callers
    /// manage dirty flags themselves.
    pub(crate) fn types_mut(&mut self) -> &mut [VoxelTypeId] {
        &mut self.types
    }

    /// All health values, linear-indexed.
    pub fn health(&self) -> &[u8] {
        &self.health
    }

    /// Mutable health values, linear-indexed.
    pub(crate) fn health_mut(&mut self) -> &mut [u8] {
        &mut self.health
    }

    /// All ramp hints, linear-indexed.
    pub fn ramps(&self) -> &[RampKind] {
        &self.ramps
    }

    /// Mutable ramp hints, linear-indexed.
    pub(crate) fn ramps_mut(&mut self) -> &mut [RampKind] {
        &mut self.ramps
    }

    /// All sunlight values, linear-indexed.
    pub fn sun(&self) -> &[u8] {
        &self.sun
    }

    /// Mutable sunlight values, linear-indexed.
    pub fn sun_mut(&mut self) -> &mut [u8] {
        &mut self.sun
    }

    /// All explored flags, linear-indexed.
    pub fn explored(&self) -> &[bool] {
        &self.explored
    }

    /// Mutable explored flags, linear-indexed.
    pub(crate) fn explored_mut(&mut self) -> &mut [bool] {
        &mut self.explored
    }

    /// All water states, linear-indexed.
    pub fn water(&self) -> &[WaterState] {
        &self.water
    }

    /// Mutable water states, linear-indexed.
    pub fn water_mut(&mut self) -> &mut [WaterState] {
        &mut self.water
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
