//! Line Diffs
//!
//! Line-level edit scripts between two revisions of a file. The engine only
//! needs the shape of the change (how many lines were kept, removed, or
//! added, in order), so hunks produced by git are flattened into a sequence
//! of [`DiffEdit`]s covering the whole file:
//!
//! ```text
//! old:  1 2 3 4 5        hunk @@ -2,2 +2,1 @@
//! new:  1 X 4 5
//!
//! edits: Equal(1) Delete(2) Insert(1) Equal(2)
//! ```

use git2::{DiffOptions, Patch};
use serde::{Deserialize, Serialize};

use super::error::{ScanError, ScanResult};

/// Kind of a single edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    Equal,
    Insert,
    Delete,
}

/// One run of equal, inserted or deleted lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEdit {
    pub kind: EditKind,
    /// Number of lines in this run
    pub size: usize,
}

impl DiffEdit {
    pub fn equal(size: usize) -> Self {
        Self { kind: EditKind::Equal, size }
    }

    pub fn insert(size: usize) -> Self {
        Self { kind: EditKind::Insert, size }
    }

    pub fn delete(size: usize) -> Self {
        Self { kind: EditKind::Delete, size }
    }
}

/// A hunk header as reported by git (1-based starts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
}

/// Edit script between two revisions of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub old_lines: usize,
    pub new_lines: usize,
    pub edits: Vec<DiffEdit>,
}

impl FileDiff {
    /// Compute the line diff between two texts
    pub fn between(old: &str, new: &str) -> ScanResult<Self> {
        let mut options = DiffOptions::new();
        options.context_lines(0);

        let patch = Patch::from_buffers(old.as_bytes(), None, new.as_bytes(), None, Some(&mut options))
            .map_err(|e| ScanError::diff(format!("Failed to diff buffers: {}", e)))?;

        let mut hunks = Vec::with_capacity(patch.num_hunks());
        for index in 0..patch.num_hunks() {
            let (hunk, _) = patch
                .hunk(index)
                .map_err(|e| ScanError::diff(format!("Failed to read hunk {}: {}", index, e)))?;
            hunks.push(Hunk {
                old_start: hunk.old_start() as usize,
                old_lines: hunk.old_lines() as usize,
                new_start: hunk.new_start() as usize,
                new_lines: hunk.new_lines() as usize,
            });
        }

        Ok(Self::from_hunks(count_lines(old), count_lines(new), &hunks))
    }

    /// Flatten zero-context hunks into an edit script covering the whole file
    pub fn from_hunks(old_lines: usize, new_lines: usize, hunks: &[Hunk]) -> Self {
        let mut edits = Vec::new();
        let mut old_cursor = 0;

        for hunk in hunks {
            // a pure insertion reports the line it follows, not the first changed line
            let unchanged_before = if hunk.old_lines == 0 {
                hunk.old_start
            } else {
                hunk.old_start.saturating_sub(1)
            };

            push_edit(&mut edits, DiffEdit::equal(unchanged_before.saturating_sub(old_cursor)));
            push_edit(&mut edits, DiffEdit::delete(hunk.old_lines));
            push_edit(&mut edits, DiffEdit::insert(hunk.new_lines));
            old_cursor = unchanged_before.max(old_cursor) + hunk.old_lines;
        }

        push_edit(&mut edits, DiffEdit::equal(old_lines.saturating_sub(old_cursor)));

        Self {
            old_lines,
            new_lines,
            edits,
        }
    }

    /// True when the edit script changes nothing
    pub fn is_unchanged(&self) -> bool {
        self.edits.iter().all(|e| e.kind == EditKind::Equal)
    }
}

fn push_edit(edits: &mut Vec<DiffEdit>, edit: DiffEdit) {
    if edit.size > 0 {
        edits.push(edit);
    }
}

/// Number of lines in a text, as git counts them
pub fn count_lines(text: &str) -> usize {
    text.lines().count()
}
