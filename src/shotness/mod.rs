//! Structural Hotness Engine
//!
//! Tracks how often each structural unit (function, method, ...) changes
//! across history and how often pairs of units change in the same commit.
//!
//! ```text
//! Commit ──> NodeExtractor ──> LineIndex ──> correlate ──> NodeRegistry
//!                                                              │
//!                                       RawReport <── finalize ┘
//! ```

pub mod analyzer;
pub mod checkpoint;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod line_index;
pub mod merges;
pub mod registry;
pub mod report;
pub mod summary;

pub use analyzer::HistoryAnalyzer;
pub use checkpoint::{CheckpointManager, CheckpointMetadata, CheckpointState};
pub use config::{ConfigError, ShotnessConfig, DEFAULT_MAX_COUPLING_NODES};
pub use engine::ShotnessEngine;
pub use error::{ShotnessError, ShotnessResult};
pub use extractor::{NodeExtractor, DEFAULT_NAME_QUERY, DEFAULT_STRUCT_QUERY};
pub use merges::MergeTracker;
pub use registry::{NodeRegistry, RegistryEntry};
pub use report::{CommitStats, RawReport};
pub use summary::NodeSummary;
