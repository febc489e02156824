//! Commit and file-change records fed to the engine

use serde::{Deserialize, Serialize};

use super::diff::FileDiff;
use super::error::ScanResult;
use crate::uast::Node;

/// How a file changed in a commit, derived from which trees are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Deleted,
    Modified,
    /// Neither side has a tree; nothing to track
    Untracked,
}

/// One changed file with its before/after trees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path before the change (empty for insertions)
    pub from: String,
    /// Path after the change (empty for deletions)
    pub to: String,
    pub before: Option<Node>,
    pub after: Option<Node>,
    /// Line diff between the two revisions; only meaningful for modifications
    pub diff: Option<FileDiff>,
}

impl FileChange {
    pub fn insertion(path: impl Into<String>, after: Node) -> Self {
        Self {
            to: path.into(),
            after: Some(after),
            ..Self::default()
        }
    }

    pub fn deletion(path: impl Into<String>, before: Node) -> Self {
        Self {
            from: path.into(),
            before: Some(before),
            ..Self::default()
        }
    }

    pub fn modification(
        from: impl Into<String>,
        to: impl Into<String>,
        before: Node,
        after: Node,
        diff: Option<FileDiff>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            before: Some(before),
            after: Some(after),
            diff,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, Some(_)) => ChangeKind::Inserted,
            (Some(_), None) => ChangeKind::Deleted,
            (Some(_), Some(_)) => ChangeKind::Modified,
            (None, None) => ChangeKind::Untracked,
        }
    }

    pub fn is_rename(&self) -> bool {
        self.kind() == ChangeKind::Modified && self.from != self.to
    }
}

/// One commit as seen by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub parent_count: usize,
    pub changes: Vec<FileChange>,
}

impl Commit {
    pub fn new(hash: impl Into<String>, parent_count: usize, changes: Vec<FileChange>) -> Self {
        Self {
            hash: hash.into(),
            parent_count,
            changes,
        }
    }

    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Chronological source of commits
pub trait CommitStream: Iterator<Item = ScanResult<Commit>> {}

impl<T> CommitStream for T where T: Iterator<Item = ScanResult<Commit>> {}
