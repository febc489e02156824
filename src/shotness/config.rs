//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::extractor::{DEFAULT_NAME_QUERY, DEFAULT_STRUCT_QUERY};

/// Commits touching more units than this skip the coupling update
pub const DEFAULT_MAX_COUPLING_NODES: usize = 500;

/// Shotness engine and pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotnessConfig {
    /// Structural query selecting trackable units
    pub dsl_struct: String,
    /// Name query applied to each selected unit
    pub dsl_name: String,
    /// Coupling cap per commit (0 disables the cap)
    pub max_coupling_nodes: usize,
    /// Number of history shards processed in parallel
    pub shards: usize,
    /// Commits per streaming chunk
    pub chunk_size: usize,
    /// Estimated engine size that triggers hibernation (in bytes)
    pub max_memory_bytes: usize,
    /// Where checkpoints are written; None disables checkpointing
    pub checkpoint_dir: Option<PathBuf>,
}

/// Configuration validation error
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Structural query must not be empty")]
    EmptyStructQuery,
    #[error("Name query must not be empty")]
    EmptyNameQuery,
    #[error("Shard count must be greater than zero")]
    InvalidShards,
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
    #[error("Maximum memory bytes must be greater than zero")]
    InvalidMaxMemory,
}

impl Default for ShotnessConfig {
    fn default() -> Self {
        Self {
            dsl_struct: DEFAULT_STRUCT_QUERY.to_string(),
            dsl_name: DEFAULT_NAME_QUERY.to_string(),
            max_coupling_nodes: DEFAULT_MAX_COUPLING_NODES,
            shards: 1,
            chunk_size: 1000,
            max_memory_bytes: 256 * 1024 * 1024, // 256 MB default
            checkpoint_dir: None,
        }
    }
}

impl ShotnessConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dsl_struct.trim().is_empty() {
            return Err(ConfigError::EmptyStructQuery);
        }
        if self.dsl_name.trim().is_empty() {
            return Err(ConfigError::EmptyNameQuery);
        }
        if self.shards == 0 {
            return Err(ConfigError::InvalidShards);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if self.max_memory_bytes == 0 {
            return Err(ConfigError::InvalidMaxMemory);
        }
        Ok(())
    }

    /// Get memory budget as a human-readable string
    pub fn memory_display(&self) -> String {
        let mb = self.max_memory_bytes / (1024 * 1024);
        if mb >= 1024 {
            format!("{:.1} GB", mb as f64 / 1024.0)
        } else {
            format!("{} MB", mb)
        }
    }
}
