//! Runtime configuration for the strata terrain core.
//!
//! Configuration structs with sensible defaults and RON persistence.
//! Every section tolerates missing fields (`#[serde(default)]`), so old
//! config files keep working as new settings appear.

mod config;
mod error;

pub use config::{Config, DebugConfig, LightingConfig, PipelineConfig, WorldConfig};
pub use error::ConfigError;
