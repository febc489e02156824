//! Repository Scanner Module
//!
//! Turns git history into the commit records consumed by the shotness
//! engine: per-commit file changes with before/after UASTs and line diffs.

pub mod commit;
pub mod diff;
pub mod error;
pub mod history;

pub use commit::{ChangeKind, Commit, CommitStream, FileChange};
pub use diff::{count_lines, DiffEdit, EditKind, FileDiff, Hunk};
pub use error::{ScanError, ScanResult};
pub use history::HistoryWalker;
