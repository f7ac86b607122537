//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level terrain core configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World/chunk settings.
    pub world: WorldConfig,
    /// Lighting settings.
    pub lighting: LightingConfig,
    /// Rebuild pipeline settings.
    pub pipeline: PipelineConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World and chunk storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk size along X, in voxels.
    pub chunk_size_x: usize,
    /// Chunk size along Y, in voxels.
    pub chunk_size_y: usize,
    /// Chunk size along Z, in voxels.
    pub chunk_size_z: usize,
    /// Admission ceiling: maximum number of simultaneously loaded chunks.
    pub max_chunks: usize,
    /// Directory for chunk save files. `None` uses the platform data dir.
    pub save_dir: Option<PathBuf>,
    /// Whether chunk files are written run-length compressed.
    pub compress_saves: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size_x: 16,
            chunk_size_y: 64,
            chunk_size_z: 16,
            max_chunks: 4096,
            save_dir: None,
            compress_saves: true,
        }
    }
}

/// Lighting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Whether global sunlight is simulated per column.
    pub sunlight_enabled: bool,
    /// Flood intensity used when sunlight simulation is disabled.
    pub sun_fallback: u8,
    /// Fog-of-war vertex color for visible non-solid voxels:
    /// `(sun, ambient, dynamic)`.
    pub fog_color: (u8, u8, u8),
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sunlight_enabled: true,
            sun_fallback: 96,
            fog_color: (32, 48, 0),
        }
    }
}

/// Rebuild pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Water-simulation trigger interval, in milliseconds.
    pub water_tick_ms: u64,
    /// Capacity of the chunk generation request queue.
    pub generation_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            water_tick_ms: 250,
            generation_capacity: 64,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (tracing `EnvFilter` syntax). Empty uses the
    /// built-in default.
    pub log_level: String,
    /// Write a JSON log file alongside console output.
    pub log_to_file: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::new(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Loads configuration from a RON file.
    ///
    /// Missing fields fall back to defaults; a missing file is an error —
    /// use [`load_or_default`](Self::load_or_default) for first-run flows.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(ConfigError::Parse)
    }

    /// Loads configuration, or returns defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the configuration as pretty-printed RON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::Serialize)?;
        std::fs::write(path, text).map_err(io_err)
    }

    /// The effective chunk save directory: the configured one, or the
    /// platform data dir.
    pub fn save_dir(&self) -> PathBuf {
        self.world.save_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("strata")
                .join("chunks")
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
