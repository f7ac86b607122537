//! Voxel type registry: maps compact [`VoxelTypeId`] values to [`VoxelTypeDef`] metadata.
//!
//! The registry is built once during startup, before any worker thread
//! runs, and shared immutably afterwards. The empty type is always ID 0 so
//! that zero-initialized chunk memory represents empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compact identifier stored inside every voxel cell.
///
/// ID 0 is always the empty type: a voxel is empty iff its type is 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelTypeId(pub u16);

impl VoxelTypeId {
    /// The empty type.
    pub const EMPTY: VoxelTypeId = VoxelTypeId(0);

    /// True iff this is the empty type.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Full descriptor for a voxel type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoxelTypeDef {
    /// Human-readable name (e.g. "stone", "soil", "water").
    pub name: String,
    /// Whether the voxel forms solid terrain (occludes lighting, blocks rays).
    pub solid: bool,
    /// Light emission level (0 = none, 255 = max).
    pub light_emission: u8,
    /// Whether mesh generation may slope this voxel into a ramp.
    pub ramp_capable: bool,
}

/// Errors that can occur during voxel type registration.
#[derive(Debug, Error)]
pub enum VoxelTypeError {
    /// A type with the same name has already been registered.
    #[error("duplicate voxel type name: {0}")]
    DuplicateName(String),
    /// All `u16` slots have been consumed.
    #[error("voxel type registry is full (max 65536 types)")]
    RegistryFull,
}

/// Maps [`VoxelTypeId`] → [`VoxelTypeDef`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
pub struct VoxelTypeRegistry {
    /// Dense array where `index == VoxelTypeId.0`.
    types: Vec<VoxelTypeDef>,
    /// Reverse lookup: name → ID.
    name_to_id: HashMap<String, VoxelTypeId>,
}

impl VoxelTypeRegistry {
    /// Creates a new registry with the empty type pre-registered as ID 0.
    pub fn new() -> Self {
        let empty = VoxelTypeDef {
            name: "empty".to_string(),
            solid: false,
            light_emission: 0,
            ramp_capable: false,
        };

        let mut name_to_id = HashMap::new();
        name_to_id.insert("empty".to_string(), VoxelTypeId::EMPTY);

        Self {
            types: vec![empty],
            name_to_id,
        }
    }

    /// Registers a new voxel type and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 1 (0 is the empty type).
    ///
    /// # Errors
    ///
    /// Returns [`VoxelTypeError::DuplicateName`] if a type with the same
    /// name already exists, or [`VoxelTypeError::RegistryFull`] if all
    /// 65 536 slots are consumed.
    pub fn register(&mut self, def: VoxelTypeDef) -> Result<VoxelTypeId, VoxelTypeError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(VoxelTypeError::DuplicateName(def.name));
        }
        if self.types.len() > u16::MAX as usize {
            return Err(VoxelTypeError::RegistryFull);
        }

        let id = VoxelTypeId(self.types.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range — this indicates a programming error
    /// since IDs are only produced by the registry itself.
    pub fn get(&self, id: VoxelTypeId) -> &VoxelTypeDef {
        &self.types[id.0 as usize]
    }

    /// Looks up a type ID by name.
    pub fn lookup(&self, name: &str) -> Option<VoxelTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// True iff the type forms solid terrain. Unknown IDs are non-solid.
    pub fn is_solid(&self, id: VoxelTypeId) -> bool {
        self.types.get(id.0 as usize).is_some_and(|d| d.solid)
    }

    /// True iff the type emits light. Unknown IDs emit nothing.
    pub fn emits_light(&self, id: VoxelTypeId) -> bool {
        self.types
            .get(id.0 as usize)
            .is_some_and(|d| d.light_emission > 0)
    }

    /// True iff the type may be sloped into a ramp.
    pub fn is_ramp_capable(&self, id: VoxelTypeId) -> bool {
        self.types.get(id.0 as usize).is_some_and(|d| d.ramp_capable)
    }

    /// Number of registered types, including the empty type.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: the empty type is pre-registered.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for VoxelTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
