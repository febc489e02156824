//! Diff Correlator
//!
//! Walks a line edit script with one cursor per revision and reports every
//! unit covering a deleted line (looked up in the before index) or an
//! inserted line (looked up in the after index). Equal runs only advance
//! both cursors.

use crate::scanner::{EditKind, FileDiff};
use crate::uast::Node;

use super::line_index::LineIndex;

/// Report each unit touched by `diff`.
///
/// `touch` may be called several times for the same unit; callers are
/// expected to deduplicate per commit.
pub fn correlate<'a, F>(diff: &FileDiff, before: &LineIndex<'a>, after: &LineIndex<'a>, mut touch: F)
where
    F: FnMut(&'a str, &'a Node),
{
    let mut before_line = 0;
    let mut after_line = 0;

    for edit in &diff.edits {
        match edit.kind {
            EditKind::Equal => {
                before_line += edit.size;
                after_line += edit.size;
            }
            EditKind::Delete => {
                visit_range(before, before_line, edit.size, &mut touch);
                before_line += edit.size;
            }
            EditKind::Insert => {
                visit_range(after, after_line, edit.size, &mut touch);
                after_line += edit.size;
            }
        }
    }
}

fn visit_range<'a, F>(index: &LineIndex<'a>, start: usize, size: usize, touch: &mut F)
where
    F: FnMut(&'a str, &'a Node),
{
    for line in start..(start + size).min(index.len()) {
        for &(name, node) in index.at(line) {
            touch(name, node);
        }
    }
}
