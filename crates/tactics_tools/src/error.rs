//! Error type for the development tools.

use std::path::PathBuf;

use tactics_core::error::BattleError;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised while loading or inspecting data files.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A RON file did not match its expected format.
    #[error("Failed to parse {path}: {source}")]
    Ron {
        /// File that failed.
        path: PathBuf,
        /// Parser error with position.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The battle core rejected the data.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// Validation found errors.
    #[error("Validation failed with {count} error(s)")]
    ValidationFailed {
        /// Number of errors found.
        count: usize,
    },
}
