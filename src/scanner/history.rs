//! Git History Walker
//!
//! Presents repository history as a chronological [`CommitStream`]. Each
//! commit is diffed against its first parent with rename detection enabled,
//! and every changed file in a supported language is parsed into a UAST on
//! both sides of the change.
//!
//! ```text
//! revwalk (topological, oldest first)
//!   └── commit
//!         ├── diff_tree_to_tree(first parent, tree) + find_similar
//!         └── per delta
//!               ├── Added     -> FileChange::insertion
//!               ├── Deleted   -> FileChange::deletion
//!               └── Modified / Renamed
//!                             -> FileChange::modification + FileDiff
//! ```
//!
//! A walker owns its `git2::Repository`, so shards running on different
//! threads each open their own walker over a slice of commit ids.

use git2::{Delta, DiffFile, DiffFindOptions, DiffOptions, Oid, Repository, Sort};
use log::{debug, trace};
use std::path::Path;

use super::commit::{Commit, FileChange};
use super::diff::FileDiff;
use super::error::{ScanError, ScanResult};
use crate::uast::{parse_source, Node, SourceLanguage};

/// One side of a file change, loaded and parsed
struct Revision {
    path: String,
    text: String,
    tree: Node,
}

/// Chronological commit iterator backed by git2
pub struct HistoryWalker {
    repo: Repository,
    pending: std::vec::IntoIter<Oid>,
}

impl HistoryWalker {
    /// Walk the full history reachable from HEAD
    pub fn open(path: &Path) -> ScanResult<Self> {
        let ids = Self::commit_ids(path)?;
        Self::for_commits(path, &ids)
    }

    /// Walk exactly the given commits, in the given order
    pub fn for_commits(path: &Path, ids: &[String]) -> ScanResult<Self> {
        let repo = open_repository(path)?;
        let oids = ids
            .iter()
            .map(|id| {
                Oid::from_str(id).map_err(|e| ScanError::repository(format!("Invalid commit id '{}': {}", id, e)))
            })
            .collect::<ScanResult<Vec<_>>>()?;

        debug!("History walker prepared for {} commits", oids.len());
        Ok(Self {
            repo,
            pending: oids.into_iter(),
        })
    }

    /// List commit ids reachable from HEAD, oldest first
    pub fn commit_ids(path: &Path) -> ScanResult<Vec<String>> {
        let repo = open_repository(path)?;

        if repo.is_empty().unwrap_or(false) {
            debug!("Repository at {} has no commits", path.display());
            return Ok(Vec::new());
        }

        let mut revwalk = repo
            .revwalk()
            .map_err(|e| ScanError::repository(format!("Failed to create revwalk: {}", e)))?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(|e| ScanError::repository(format!("Failed to set revwalk order: {}", e)))?;
        revwalk
            .push_head()
            .map_err(|e| ScanError::repository(format!("Failed to push HEAD: {}", e)))?;

        let mut ids = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(|e| ScanError::repository(format!("Failed to get commit OID: {}", e)))?;
            ids.push(oid.to_string());
        }

        debug!("Found {} commits reachable from HEAD", ids.len());
        Ok(ids)
    }

    fn convert_commit(&self, oid: Oid) -> ScanResult<Commit> {
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| ScanError::repository(format!("Failed to find commit {}: {}", oid, e)))?;

        let tree = commit
            .tree()
            .map_err(|e| ScanError::repository(format!("Failed to read tree of {}: {}", oid, e)))?;
        let parent_tree = if commit.parent_count() > 0 {
            let parent = commit
                .parent(0)
                .map_err(|e| ScanError::repository(format!("Failed to read parent of {}: {}", oid, e)))?;
            Some(
                parent
                    .tree()
                    .map_err(|e| ScanError::repository(format!("Failed to read parent tree of {}: {}", oid, e)))?,
            )
        } else {
            None
        };

        let mut diff_opts = DiffOptions::new();
        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))
            .map_err(|e| ScanError::repository(format!("Failed to create diff: {}", e)))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| ScanError::repository(format!("Failed to detect renames: {}", e)))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            if let Some(change) = self.convert_delta(delta.status(), delta.old_file(), delta.new_file())? {
                changes.push(change);
            }
        }

        trace!("Commit {} converted with {} tracked file changes", oid, changes.len());
        Ok(Commit::new(oid.to_string(), commit.parent_count(), changes))
    }

    fn convert_delta(&self, status: Delta, old_file: DiffFile<'_>, new_file: DiffFile<'_>) -> ScanResult<Option<FileChange>> {
        let before = match status {
            Delta::Deleted | Delta::Modified | Delta::Renamed => self.load_revision(&old_file)?,
            _ => None,
        };
        let after = match status {
            Delta::Added | Delta::Modified | Delta::Renamed => self.load_revision(&new_file)?,
            _ => None,
        };

        let change = match (before, after) {
            (None, None) => None,
            (None, Some(after)) => Some(FileChange::insertion(after.path, after.tree)),
            (Some(before), None) => Some(FileChange::deletion(before.path, before.tree)),
            (Some(before), Some(after)) => {
                let diff = match FileDiff::between(&before.text, &after.text) {
                    Ok(diff) => Some(diff),
                    Err(e) => {
                        debug!("No line diff for {}: {}", after.path, e);
                        None
                    }
                };
                Some(FileChange::modification(before.path, after.path, before.tree, after.tree, diff))
            }
        };
        Ok(change)
    }

    fn load_revision(&self, file: &DiffFile<'_>) -> ScanResult<Option<Revision>> {
        let Some(path) = file.path().map(|p| p.to_string_lossy().into_owned()) else {
            return Ok(None);
        };
        let Some(language) = SourceLanguage::from_path(&path) else {
            trace!("Skipping {}: unsupported language", path);
            return Ok(None);
        };

        let blob = self
            .repo
            .find_blob(file.id())
            .map_err(|e| ScanError::repository(format!("Failed to read blob for {}: {}", path, e)))?;
        if blob.is_binary() {
            trace!("Skipping {}: binary content", path);
            return Ok(None);
        }

        let text = String::from_utf8_lossy(blob.content()).into_owned();
        let tree = parse_source(language, &text).unwrap_or_else(|| {
            debug!("Failed to parse {} as {}, tracking it with an empty tree", path, language.name());
            Node::new("File")
        });

        Ok(Some(Revision { path, text, tree }))
    }
}

impl Iterator for HistoryWalker {
    type Item = ScanResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.pending.next()?;
        Some(self.convert_commit(oid))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

fn open_repository(path: &Path) -> ScanResult<Repository> {
    Repository::open(path)
        .map_err(|e| ScanError::repository_with_path(format!("Failed to open repository: {}", e), path))
}
