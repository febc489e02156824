//! Shotness Error Types
//!
//! Only persistence can fail inside the engine: everything else degrades to
//! under-counting. Checkpoint and report encoding failures are surfaced to
//! the caller.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShotnessError {
    /// Checkpoint file could not be read or written
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Checkpoint state failed to encode or decode
    #[error("Checkpoint encoding error: {0}")]
    Codec(String),

    /// Checkpoint metadata is missing or malformed
    #[error("Checkpoint metadata error: {0}")]
    Metadata(String),

    /// Checkpoint was written for another repository
    #[error("Checkpoint belongs to repository '{found}', expected '{expected}'")]
    RepositoryMismatch { expected: String, found: String },

    /// Checkpoint was written by an incompatible format version
    #[error("Unsupported checkpoint format version: {0}")]
    UnsupportedVersion(u32),

    /// Serialized report is not a shotness binary envelope
    #[error("Invalid report envelope: {0}")]
    Envelope(String),

    /// Engine configuration is invalid
    #[error("Invalid engine configuration: {0}")]
    Configuration(String),
}

impl ShotnessError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn envelope(msg: impl Into<String>) -> Self {
        Self::Envelope(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the checkpoint on disk can simply be discarded and rebuilt
    pub fn is_stale_checkpoint(&self) -> bool {
        matches!(
            self,
            ShotnessError::RepositoryMismatch { .. } | ShotnessError::UnsupportedVersion(_)
        )
    }
}

pub type ShotnessResult<T> = Result<T, ShotnessError>;
