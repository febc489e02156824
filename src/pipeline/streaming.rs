//! Chunked Streaming Driver
//!
//! Feeds one engine in bounded chunks of commits. Between chunks the engine
//! is checkpointed (when a checkpoint manager is configured) and, once its
//! estimated size exceeds the memory budget, hibernated and booted again to
//! drop transient bookkeeping.

use log::{debug, info, warn};

use crate::cli::memory_parser::format_memory_size;
use crate::scanner::{CommitStream, ScanResult};
use crate::shotness::{CheckpointManager, ShotnessEngine};

use super::{drive, CancellationFlag, PipelineResult};

/// Warn when the estimated size reaches this share of the budget (percent)
const MEMORY_WARNING_PERCENT: usize = 80;

/// Counters describing a streaming run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub chunks: usize,
    pub commits: usize,
    pub hibernations: usize,
    pub checkpoints_saved: usize,
    pub peak_estimated_size: usize,
}

pub struct StreamingDriver<'a> {
    chunk_size: usize,
    max_memory_bytes: usize,
    checkpoints: Option<&'a CheckpointManager>,
    cancel: CancellationFlag,
}

impl<'a> StreamingDriver<'a> {
    pub fn new(chunk_size: usize, max_memory_bytes: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_memory_bytes,
            checkpoints: None,
            cancel: CancellationFlag::new(),
        }
    }

    /// Save a checkpoint after every chunk
    pub fn with_checkpoints(mut self, manager: &'a CheckpointManager) -> Self {
        self.checkpoints = Some(manager);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Consume `commit_ids` chunk by chunk; `open_stream` builds the commit
    /// stream of one chunk
    pub fn run<F, S>(&self, engine: &mut ShotnessEngine, commit_ids: &[String], mut open_stream: F) -> PipelineResult<StreamingStats>
    where
        F: FnMut(&[String]) -> ScanResult<S>,
        S: CommitStream,
    {
        let mut stats = StreamingStats::default();

        for chunk in commit_ids.chunks(self.chunk_size) {
            self.cancel.check()?;
            let stream = open_stream(chunk)?;
            stats.commits += drive(engine, stream, &self.cancel)?;
            stats.chunks += 1;

            let size = engine.estimated_size();
            stats.peak_estimated_size = stats.peak_estimated_size.max(size);
            debug!(
                "Chunk {} done: {} commits, estimated size {} bytes",
                stats.chunks, stats.commits, size
            );

            if let Some(manager) = self.checkpoints {
                manager.save(engine)?;
                stats.checkpoints_saved += 1;
            }

            if size > self.max_memory_bytes {
                info!(
                    "Estimated size {} exceeds budget of {}, hibernating",
                    format_memory_size(size),
                    format_memory_size(self.max_memory_bytes)
                );
                engine.hibernate();
                engine.boot();
                stats.hibernations += 1;
            } else if size.saturating_mul(100) >= self.max_memory_bytes.saturating_mul(MEMORY_WARNING_PERCENT) {
                warn!(
                    "Estimated size {} is above {}% of the {} budget",
                    format_memory_size(size),
                    MEMORY_WARNING_PERCENT,
                    format_memory_size(self.max_memory_bytes)
                );
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Commit, FileChange};
    use crate::shotness::NodeExtractor;
    use crate::uast::Node;
    use tempfile::TempDir;

    fn tree(name: &str) -> Node {
        Node::new("File").with_child(
            Node::new("Function")
                .with_role("Function")
                .with_prop("name", name)
                .with_lines(1, 1),
        )
    }

    /// Every id becomes a merge commit inserting one file
    fn merge_commits(ids: &[String]) -> ScanResult<std::vec::IntoIter<ScanResult<Commit>>> {
        Ok(ids
            .iter()
            .map(|id| {
                Ok(Commit::new(
                    id.clone(),
                    2,
                    vec![FileChange::insertion(format!("{}.rs", id), tree(id))],
                ))
            })
            .collect::<Vec<_>>()
            .into_iter())
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    fn engine() -> ShotnessEngine {
        ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 500)
    }

    #[test]
    fn test_chunks_and_hibernation() {
        let mut engine = engine();
        let driver = StreamingDriver::new(2, 1);

        let stats = driver.run(&mut engine, &ids(5), merge_commits).unwrap();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.commits, 5);
        assert_eq!(stats.hibernations, 3);
        assert_eq!(stats.checkpoints_saved, 0);
        assert!(stats.peak_estimated_size > 0);

        // hibernation drops merge hashes but keeps every unit
        assert_eq!(engine.registry().len(), 5);
        assert!(engine.merges().is_empty());
        assert!(!engine.merges().is_hibernated());
    }

    #[test]
    fn test_no_hibernation_under_budget() {
        let mut engine = engine();
        let driver = StreamingDriver::new(10, usize::MAX);
        let stats = driver.run(&mut engine, &ids(4), merge_commits).unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.hibernations, 0);
        assert_eq!(engine.merges().len(), 4);
    }

    #[test]
    fn test_checkpoint_after_each_chunk() {
        let temp = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp.path(), "/repo");
        let mut engine = engine();

        let driver = StreamingDriver::new(3, usize::MAX).with_checkpoints(&manager);
        let stats = driver.run(&mut engine, &ids(7), merge_commits).unwrap();
        assert_eq!(stats.checkpoints_saved, 3);

        let metadata = manager.load_metadata().unwrap();
        assert_eq!(metadata.commits_processed, 7);
        assert_eq!(metadata.last_commit.as_deref(), Some("c6"));
    }

    #[test]
    fn test_cancelled_before_first_chunk() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let mut engine = engine();
        let driver = StreamingDriver::new(2, 1024).with_cancellation(cancel);

        let err = driver.run(&mut engine, &ids(3), merge_commits).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(engine.commits_processed(), 0);
    }
}
