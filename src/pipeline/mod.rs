//! Analysis Pipeline
//!
//! Drives analyzers over commit streams, either as parallel shards over
//! disjoint commit ranges or as a single engine fed in bounded chunks.
//!
//! ```text
//! commit ids ──┬── sharding:  partition ─> fork ─> rayon shards ─> merge
//!              └── streaming: chunk ─> drive ─> checkpoint ─> hibernate/boot
//! ```

pub mod cancellation;
pub mod error;
pub mod sharding;
pub mod streaming;

use log::trace;

use crate::scanner::{CommitStream, ScanResult};
use crate::shotness::HistoryAnalyzer;

pub use cancellation::CancellationFlag;
pub use error::{PipelineError, PipelineResult};
pub use sharding::{partition, run_sharded};
pub use streaming::{StreamingDriver, StreamingStats};

/// Feed every commit of `stream` to `analyzer`, checking for cancellation
/// before each one. Returns the number of commits consumed.
pub fn drive<S>(analyzer: &mut dyn HistoryAnalyzer, stream: S, cancel: &CancellationFlag) -> ScanResult<usize>
where
    S: CommitStream,
{
    let mut consumed = 0;
    for commit in stream {
        cancel.check()?;
        let commit = commit?;
        trace!("{}: consuming {}", analyzer.name(), commit.hash);
        analyzer.consume(&commit);
        consumed += 1;
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Commit, ScanError};
    use crate::shotness::{NodeExtractor, ShotnessEngine};

    fn engine() -> ShotnessEngine {
        ShotnessEngine::new(NodeExtractor::with_defaults().unwrap(), 500)
    }

    #[test]
    fn test_drive_counts_commits() {
        let mut engine = engine();
        let commits = (0..4).map(|i| Ok::<_, ScanError>(Commit::new(format!("c{}", i), 1, Vec::new())));
        let consumed = drive(&mut engine, commits, &CancellationFlag::new()).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(engine.commits_processed(), 4);
    }

    #[test]
    fn test_drive_stops_when_cancelled() {
        let mut engine = engine();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let commits = vec![Ok::<_, ScanError>(Commit::new("c0", 1, Vec::new()))].into_iter();
        let err = drive(&mut engine, commits, &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(engine.commits_processed(), 0);
    }

    #[test]
    fn test_drive_propagates_stream_errors() {
        let mut engine = engine();
        let commits = vec![
            Ok(Commit::new("c0", 1, Vec::new())),
            Err(ScanError::repository("object missing")),
        ]
        .into_iter();
        assert!(drive(&mut engine, commits, &CancellationFlag::new()).is_err());
        assert_eq!(engine.commits_processed(), 1);
    }
}
