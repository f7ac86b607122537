//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading, saving, or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("config file access failed at {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The file contents are not valid RON for this schema.
    #[error("config is not valid RON: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// The configuration could not be rendered as RON.
    #[error("config serialization failed: {0}")]
    Serialize(#[source] ron::Error),
}
