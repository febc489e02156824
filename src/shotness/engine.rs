//! Shotness Engine
//!
//! Consumes commits one at a time and maintains the unit registry. Within a
//! commit the order of operations is fixed:
//!
//! ```text
//! commit
//!  ├── merge dedup            skip a merge already consumed
//!  ├── insertions             touch every unit of the new file
//!  ├── modifications          rename, then touch units on changed lines
//!  ├── coupling update        all pairs of units touched in this commit
//!  └── deletions              drop units of deleted files and their couplings
//! ```
//!
//! Deletions run last so that every unit touched in the commit still exists
//! when couplings are accumulated.

use log::{debug, trace, warn};
use std::any::Any;
use std::collections::BTreeMap;

use crate::scanner::{ChangeKind, Commit};

use super::analyzer::HistoryAnalyzer;
use super::checkpoint::CheckpointState;
use super::config::ShotnessConfig;
use super::error::{ShotnessError, ShotnessResult};
use super::extractor::NodeExtractor;
use super::merges::MergeTracker;
use super::registry::{NodeRegistry, TouchSet};
use super::report::{CommitStats, RawReport};

/// Estimated bytes per registry entry
pub const NODE_OVERHEAD_BYTES: usize = 150;
/// Estimated bytes per directed coupling entry
pub const COUPLE_OVERHEAD_BYTES: usize = 50;
/// Estimated bytes per recorded merge hash
pub const MERGE_HASH_OVERHEAD_BYTES: usize = 64;

/// Structural hotness engine owning one registry
#[derive(Debug, Clone)]
pub struct ShotnessEngine {
    extractor: NodeExtractor,
    max_coupling_nodes: usize,
    registry: NodeRegistry,
    merges: MergeTracker,
    commit_stats: BTreeMap<String, CommitStats>,
    commits_processed: usize,
    last_commit: Option<String>,
}

impl ShotnessEngine {
    pub fn new(extractor: NodeExtractor, max_coupling_nodes: usize) -> Self {
        Self {
            extractor,
            max_coupling_nodes,
            registry: NodeRegistry::new(),
            merges: MergeTracker::new(),
            commit_stats: BTreeMap::new(),
            commits_processed: 0,
            last_commit: None,
        }
    }

    /// Engine using the built-in DSL with the configured queries
    pub fn from_config(config: &ShotnessConfig) -> ShotnessResult<Self> {
        let extractor = NodeExtractor::with_dsl(&config.dsl_struct, &config.dsl_name)
            .map_err(|e| ShotnessError::configuration(e.to_string()))?;
        Ok(Self::new(extractor, config.max_coupling_nodes))
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn merges(&self) -> &MergeTracker {
        &self.merges
    }

    pub fn commit_stats(&self) -> &BTreeMap<String, CommitStats> {
        &self.commit_stats
    }

    /// Number of commits handed to [`consume`](Self::consume), skipped merges included
    pub fn commits_processed(&self) -> usize {
        self.commits_processed
    }

    pub fn last_commit(&self) -> Option<&str> {
        self.last_commit.as_deref()
    }

    /// Drop all accumulated state, keeping the queries and coupling cap
    pub fn reset(&mut self) {
        *self = Self::new(self.extractor.clone(), self.max_coupling_nodes);
    }

    /// Process one commit. Returns its statistics when any unit was touched.
    pub fn consume(&mut self, commit: &Commit) -> Option<CommitStats> {
        self.commits_processed += 1;
        self.last_commit = Some(commit.hash.clone());

        if !self.merges.should_consume(&commit.hash, commit.parent_count) {
            debug!("Merge commit {} already consumed, skipping", commit.hash);
            return None;
        }

        let mut touched = TouchSet::new();
        let mut deleted = Vec::new();

        for change in &commit.changes {
            match change.kind() {
                ChangeKind::Inserted => {
                    if let Some(after) = change.after.as_ref() {
                        self.registry
                            .handle_insertion(&self.extractor, &change.to, after, &mut touched);
                    }
                }
                ChangeKind::Modified => {
                    self.registry
                        .handle_modification(&self.extractor, change, &mut touched);
                }
                ChangeKind::Deleted => deleted.push(change.from.as_str()),
                ChangeKind::Untracked => {}
            }
        }

        self.registry
            .update_couplings(&touched, self.max_coupling_nodes);

        for file in deleted {
            self.registry.handle_deletion(file);
        }

        if touched.is_empty() {
            return None;
        }

        let stats = CommitStats::for_touched(touched.len());
        trace!(
            "Commit {} touched {} units ({} pairs)",
            commit.hash,
            stats.nodes_touched,
            stats.coupling_pairs
        );
        self.commit_stats.insert(commit.hash.clone(), stats);
        Some(stats)
    }

    /// Create `n` engines with this engine's configuration and empty state
    pub fn fork(&self, n: usize) -> Vec<ShotnessEngine> {
        (0..n)
            .map(|_| ShotnessEngine::new(self.extractor.clone(), self.max_coupling_nodes))
            .collect()
    }

    /// Fold branch engines into this one. The result does not depend on the
    /// order of `branches`, except for which commit is reported as last.
    pub fn merge(&mut self, branches: Vec<ShotnessEngine>) {
        let branch_count = branches.len();
        for branch in branches {
            self.registry.absorb(branch.registry);
            self.merges.union(branch.merges);
            self.commit_stats.extend(branch.commit_stats);
            self.commits_processed += branch.commits_processed;
            if branch.last_commit.is_some() {
                self.last_commit = branch.last_commit;
            }
        }
        self.registry.rebuild_file_index();
        debug!(
            "Merged {} branches, registry now holds {} units",
            branch_count,
            self.registry.len()
        );
    }

    /// Drop transient merge bookkeeping; accumulated counts are kept
    pub fn hibernate(&mut self) {
        self.merges.hibernate();
    }

    pub fn boot(&mut self) {
        self.merges.boot();
    }

    /// Approximate in-memory size of the accumulated state
    pub fn estimated_size(&self) -> usize {
        self.registry.len() * NODE_OVERHEAD_BYTES
            + self.registry.coupling_edges() * COUPLE_OVERHEAD_BYTES
            + self.merges.len() * MERGE_HASH_OVERHEAD_BYTES
    }

    /// Snapshot of the persistent state
    pub fn checkpoint_state(&self) -> CheckpointState {
        CheckpointState {
            nodes: self.registry.entries().clone(),
            merges: self.merges.to_sorted_vec(),
            commits_processed: self.commits_processed,
            last_commit: self.last_commit.clone(),
        }
    }

    /// Replace this engine's state, including its history position, with a snapshot
    pub fn restore(&mut self, state: CheckpointState) {
        self.registry = NodeRegistry::from_entries(state.nodes);
        self.merges = MergeTracker::from_hashes(state.merges);
        self.commit_stats.clear();
        self.commits_processed = state.commits_processed;
        self.last_commit = state.last_commit;
        debug!(
            "Restored engine with {} units after {} commits",
            self.registry.len(),
            self.commits_processed
        );
    }

    /// Build the raw report of the current state
    pub fn finalize(&self) -> RawReport {
        RawReport::from_entries(self.registry.entries(), self.commit_stats.clone())
    }
}

impl HistoryAnalyzer for ShotnessEngine {
    fn name(&self) -> &'static str {
        "shotness"
    }

    fn consume(&mut self, commit: &Commit) {
        ShotnessEngine::consume(self, commit);
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn HistoryAnalyzer>> {
        ShotnessEngine::fork(self, n)
            .into_iter()
            .map(|engine| Box::new(engine) as Box<dyn HistoryAnalyzer>)
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn HistoryAnalyzer>>) {
        let mut engines = Vec::with_capacity(branches.len());
        for branch in branches {
            let name = branch.name();
            match branch.into_any().downcast::<ShotnessEngine>() {
                Ok(engine) => engines.push(*engine),
                Err(_) => warn!("Skipping merge of unrelated '{}' branch", name),
            }
        }
        ShotnessEngine::merge(self, engines);
    }

    fn hibernate(&mut self) {
        ShotnessEngine::hibernate(self);
    }

    fn boot(&mut self) {
        ShotnessEngine::boot(self);
    }

    fn estimated_size(&self) -> usize {
        ShotnessEngine::estimated_size(self)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
