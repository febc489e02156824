//! Checkpoint Persistence
//!
//! Engine state is written to a per-repository directory so that a long
//! history walk can resume after an interruption.
//!
//! ```text
//! <base>/<first 16 hex chars of sha256(repo path)>/
//! ├── shotness_state.bin   bincode CheckpointState
//! └── checkpoint.json      CheckpointMetadata
//! ```
//!
//! The state file is the record of truth: it carries its own history
//! position and is replaced atomically, so metadata left over from an
//! interrupted save never decides where a resumed run starts.
//!
//! Per-commit statistics are not persisted; a resumed run reports only the
//! commits it processed itself.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::version::{self, FORMAT_VERSION};

use super::engine::ShotnessEngine;
use super::error::{ShotnessError, ShotnessResult};
use super::registry::RegistryEntry;

pub const STATE_FILE: &str = "shotness_state.bin";
pub const METADATA_FILE: &str = "checkpoint.json";

/// Persistent part of the engine state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub nodes: HashMap<String, RegistryEntry>,
    /// Merge hashes consumed so far, sorted
    pub merges: Vec<String>,
    /// Commits offered to the engine when the snapshot was taken
    pub commits_processed: usize,
    pub last_commit: Option<String>,
}

impl CheckpointState {
    pub fn to_bytes(&self) -> ShotnessResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ShotnessError::codec(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> ShotnessResult<Self> {
        bincode::deserialize(bytes).map_err(|e| ShotnessError::codec(e.to_string()))
    }

    /// Write the state atomically
    pub fn save(&self, path: &Path) -> ShotnessResult<()> {
        write_atomic(path, &self.to_bytes()?)
    }

    pub fn load(path: &Path) -> ShotnessResult<Self> {
        let bytes = fs::read(path).map_err(|e| ShotnessError::io(path, e))?;
        Self::from_bytes(&bytes)
    }
}

/// Human-readable description of a saved checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub version: u32,
    pub repo_path: String,
    pub created_at: DateTime<Utc>,
    pub commits_processed: usize,
    pub last_commit: Option<String>,
}

/// Saves, loads and clears checkpoints for one repository
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    base_dir: PathBuf,
    repo_path: String,
}

impl CheckpointManager {
    pub fn new(base_dir: impl Into<PathBuf>, repo_path: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.into(),
            repo_path: repo_path.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// Default checkpoint root under the user's cache directory
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("shotness")
            .join("checkpoints")
    }

    /// Directory name derived from the repository path
    pub fn repo_hash(repo_path: &str) -> String {
        let digest = Sha256::digest(repo_path.as_bytes());
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.base_dir.join(Self::repo_hash(&self.repo_path))
    }

    pub fn exists(&self) -> bool {
        let dir = self.checkpoint_dir();
        dir.join(STATE_FILE).is_file() && dir.join(METADATA_FILE).is_file()
    }

    /// Persist the engine's state and describe it
    pub fn save(&self, engine: &ShotnessEngine) -> ShotnessResult<CheckpointMetadata> {
        let dir = self.checkpoint_dir();
        fs::create_dir_all(&dir).map_err(|e| ShotnessError::io(&dir, e))?;

        engine.checkpoint_state().save(&dir.join(STATE_FILE))?;

        let metadata = CheckpointMetadata {
            version: FORMAT_VERSION,
            repo_path: self.repo_path.clone(),
            created_at: Utc::now(),
            commits_processed: engine.commits_processed(),
            last_commit: engine.last_commit().map(str::to_string),
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| ShotnessError::metadata(e.to_string()))?;
        write_atomic(&dir.join(METADATA_FILE), json.as_bytes())?;

        info!(
            "Saved checkpoint after {} commits ({} units) to {}",
            metadata.commits_processed,
            engine.registry().len(),
            dir.display()
        );
        Ok(metadata)
    }

    /// Read and validate the saved checkpoint
    pub fn load(&self) -> ShotnessResult<(CheckpointMetadata, CheckpointState)> {
        let dir = self.checkpoint_dir();
        let metadata = self.load_metadata()?;
        self.validate(&metadata)?;
        let state = CheckpointState::load(&dir.join(STATE_FILE))?;
        debug!(
            "Loaded checkpoint with {} units from {}",
            state.nodes.len(),
            dir.display()
        );
        Ok((metadata, state))
    }

    pub fn load_metadata(&self) -> ShotnessResult<CheckpointMetadata> {
        let path = self.checkpoint_dir().join(METADATA_FILE);
        let json = fs::read_to_string(&path).map_err(|e| ShotnessError::io(&path, e))?;
        serde_json::from_str(&json).map_err(|e| ShotnessError::metadata(e.to_string()))
    }

    /// Check the metadata was written for this repository by a compatible build
    pub fn validate(&self, metadata: &CheckpointMetadata) -> ShotnessResult<()> {
        if !version::is_compatible(metadata.version) {
            return Err(ShotnessError::UnsupportedVersion(metadata.version));
        }
        if metadata.repo_path != self.repo_path {
            return Err(ShotnessError::RepositoryMismatch {
                expected: self.repo_path.clone(),
                found: metadata.repo_path.clone(),
            });
        }
        Ok(())
    }

    /// Restore a saved checkpoint into `engine`. Returns the metadata with
    /// the position the state itself records, or None when no checkpoint
    /// exists.
    pub fn resume(&self, engine: &mut ShotnessEngine) -> ShotnessResult<Option<CheckpointMetadata>> {
        if !self.exists() {
            debug!("No checkpoint at {}", self.checkpoint_dir().display());
            return Ok(None);
        }
        let (mut metadata, state) = self.load()?;
        if metadata.commits_processed != state.commits_processed || metadata.last_commit != state.last_commit {
            warn!(
                "Checkpoint metadata says {} commits but the saved state holds {}; using the state",
                metadata.commits_processed, state.commits_processed
            );
            metadata.commits_processed = state.commits_processed;
            metadata.last_commit = state.last_commit.clone();
        }
        engine.restore(state);
        Ok(Some(metadata))
    }

    /// Remove the checkpoint directory if present
    pub fn clear(&self) -> ShotnessResult<()> {
        let dir = self.checkpoint_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| ShotnessError::io(&dir, e))?;
            debug!("Cleared checkpoint {}", dir.display());
        }
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> ShotnessResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| ShotnessError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ShotnessError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Commit, DiffEdit, FileChange, FileDiff};
    use crate::shotness::extractor::NodeExtractor;
    use crate::shotness::summary::NodeSummary;
    use crate::uast::Node;
    use tempfile::TempDir;

    fn tree() -> Node {
        Node::new("File")
            .with_child(
                Node::new("Function")
                    .with_role("Function")
                    .with_prop("name", "foo")
                    .with_lines(1, 2),
            )
            .with_child(
                Node::new("Function")
                    .with_role("Function")
                    .with_prop("name", "bar")
                    .with_lines(3, 4),
            )
    }

    fn populated_engine() -> ShotnessEngine {
        let mut engine = ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 500);
        engine.consume(&Commit::new("c1", 0, vec![FileChange::insertion("a.rs", tree())]));
        let diff = FileDiff {
            old_lines: 4,
            new_lines: 4,
            edits: vec![DiffEdit::delete(1), DiffEdit::insert(1), DiffEdit::equal(3)],
        };
        engine.consume(&Commit::new(
            "m1",
            2,
            vec![FileChange::modification("a.rs", "a.rs", tree(), tree(), Some(diff))],
        ));
        engine
    }

    #[test]
    fn test_repo_hash_is_stable() {
        let hash = CheckpointManager::repo_hash("/tmp/repo");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, CheckpointManager::repo_hash("/tmp/repo"));
        assert_ne!(hash, CheckpointManager::repo_hash("/tmp/other"));
    }

    #[test]
    fn test_save_and_resume() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        let engine = populated_engine();

        assert!(!manager.exists());
        let metadata = manager.save(&engine).unwrap();
        assert!(manager.exists());
        assert_eq!(metadata.commits_processed, 2);
        assert_eq!(metadata.last_commit.as_deref(), Some("m1"));
        assert_eq!(metadata.version, FORMAT_VERSION);

        let mut resumed = engine.fork(1).remove(0);
        let loaded = manager.resume(&mut resumed).unwrap().unwrap();
        assert_eq!(loaded.commits_processed, 2);
        assert_eq!(resumed.registry().entries(), engine.registry().entries());
        assert_eq!(resumed.merges().to_sorted_vec(), vec!["m1".to_string()]);
        assert!(resumed.commit_stats().is_empty());
    }

    #[test]
    fn test_resume_trusts_state_over_stale_metadata() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        let mut engine = ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 500);
        engine.consume(&Commit::new("c1", 0, vec![FileChange::insertion("a.rs", tree())]));
        manager.save(&engine).unwrap();

        // interrupted after the state was replaced but before the metadata was
        let diff = FileDiff {
            old_lines: 4,
            new_lines: 4,
            edits: vec![DiffEdit::delete(1), DiffEdit::insert(1), DiffEdit::equal(3)],
        };
        engine.consume(&Commit::new(
            "c2",
            1,
            vec![FileChange::modification("a.rs", "a.rs", tree(), tree(), Some(diff))],
        ));
        engine
            .checkpoint_state()
            .save(&manager.checkpoint_dir().join(STATE_FILE))
            .unwrap();
        assert_eq!(manager.load_metadata().unwrap().commits_processed, 1);

        let mut resumed = ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 500);
        let metadata = manager.resume(&mut resumed).unwrap().unwrap();
        assert_eq!(metadata.commits_processed, 2);
        assert_eq!(metadata.last_commit.as_deref(), Some("c2"));
        assert_eq!(resumed.commits_processed(), 2);

        let foo = NodeSummary::new("Function", "foo", "a.rs").key();
        assert_eq!(resumed.registry().get(&foo).unwrap().count, 2);
    }

    #[test]
    fn test_resume_without_checkpoint() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        let mut engine = populated_engine();
        assert!(manager.resume(&mut engine).unwrap().is_none());
        assert_eq!(engine.registry().len(), 2);
    }

    #[test]
    fn test_repository_mismatch() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        manager.save(&populated_engine()).unwrap();

        let mut metadata = manager.load_metadata().unwrap();
        metadata.repo_path = "/elsewhere".to_string();
        let err = manager.validate(&metadata).unwrap_err();
        assert!(matches!(err, ShotnessError::RepositoryMismatch { .. }));

        metadata.repo_path = "/repo".to_string();
        metadata.version = FORMAT_VERSION + 10000;
        let err = manager.validate(&metadata).unwrap_err();
        assert!(matches!(err, ShotnessError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_corrupt_state_is_codec_error() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        manager.save(&populated_engine()).unwrap();
        fs::write(manager.checkpoint_dir().join(STATE_FILE), b"\xff\xff\xff").unwrap();

        assert!(matches!(manager.load(), Err(ShotnessError::Codec(_))));
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        manager.save(&populated_engine()).unwrap();
        manager.clear().unwrap();
        assert!(!manager.exists());
        assert!(!manager.checkpoint_dir().exists());
        manager.clear().unwrap();
    }
}
