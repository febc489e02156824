//! History analyzer seam
//!
//! Shard runners drive analyzers through this trait without knowing their
//! concrete type. Merging receives branches as trait objects; a branch that
//! is not of the receiver's own type is skipped rather than failing the run.

use std::any::Any;

use crate::scanner::Commit;

/// A stateful analyzer fed one commit at a time
pub trait HistoryAnalyzer: Send {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Process the next commit of this analyzer's range
    fn consume(&mut self, commit: &Commit);

    /// Create `n` analyzers sharing configuration but no state
    fn fork(&self, n: usize) -> Vec<Box<dyn HistoryAnalyzer>>;

    /// Fold forked branches back into this analyzer
    fn merge(&mut self, branches: Vec<Box<dyn HistoryAnalyzer>>);

    /// Release transient bookkeeping between streaming chunks
    fn hibernate(&mut self);

    /// Prepare transient bookkeeping after hibernation
    fn boot(&mut self);

    /// Approximate in-memory size in bytes
    fn estimated_size(&self) -> usize;

    /// Convert into `Any` for downcasting during merge
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}
