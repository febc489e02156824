//! Merge-Commit Deduplicator
//!
//! History walks that follow every parent can present the same merge commit
//! once per branch. The tracker lets a merge through the first time only.
//! Its memory can be dropped between streaming chunks (hibernation) because
//! a chronological walk never presents a merge again after its chunk.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeTracker {
    seen: Option<HashSet<String>>,
}

impl MergeTracker {
    pub fn new() -> Self {
        Self {
            seen: Some(HashSet::new()),
        }
    }

    /// Restore from a list of already consumed merge hashes
    pub fn from_hashes(hashes: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: Some(hashes.into_iter().collect()),
        }
    }

    /// Whether a commit should be processed; records merge hashes
    pub fn should_consume(&mut self, hash: &str, parent_count: usize) -> bool {
        if parent_count <= 1 {
            return true;
        }
        self.seen.get_or_insert_with(HashSet::new).insert(hash.to_string())
    }

    /// Drop the recorded merges
    pub fn hibernate(&mut self) {
        self.seen = None;
    }

    /// Make the tracker ready to record merges again
    pub fn boot(&mut self) {
        self.seen.get_or_insert_with(HashSet::new);
    }

    pub fn is_hibernated(&self) -> bool {
        self.seen.is_none()
    }

    pub fn len(&self) -> usize {
        self.seen.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add every merge recorded by `other`
    pub fn union(&mut self, other: MergeTracker) {
        if let Some(hashes) = other.seen {
            self.seen.get_or_insert_with(HashSet::new).extend(hashes);
        }
    }

    /// Recorded hashes in sorted order
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut hashes: Vec<String> = self.seen.iter().flatten().cloned().collect();
        hashes.sort();
        hashes
    }
}
