//! Line-Range Index
//!
//! Maps every line of a file revision to the extracted units whose span
//! covers it. Slot `i` holds the units covering 1-based line `i + 1`, which
//! lines up with the 0-based cursors used when walking a diff.

use crate::uast::Node;

use super::extractor::ExtractedNodes;

/// A unit covering a line: its resolved name and its node
pub type IndexedNode<'a> = (&'a str, &'a Node);

/// Per-line lookup of covering units
#[derive(Debug, Default)]
pub struct LineIndex<'a> {
    lines: Vec<Vec<IndexedNode<'a>>>,
}

impl<'a> LineIndex<'a> {
    /// Build the index for a revision with `line_count` lines.
    ///
    /// Units without position data are not indexed; spans reaching past the
    /// end of the text are clipped.
    pub fn build(nodes: &'a ExtractedNodes<'a>, line_count: usize) -> Self {
        let mut lines: Vec<Vec<IndexedNode<'a>>> = vec![Vec::new(); line_count];

        for (name, node) in nodes {
            let Some(pos) = node.pos else {
                continue;
            };
            if pos.start_line == 0 {
                continue;
            }
            let end_line = resolve_end_line(node);
            for line in pos.start_line..=end_line.min(line_count) {
                lines[line - 1].push((name.as_str(), *node));
            }
        }

        Self { lines }
    }

    /// Units covering 0-based line `line`; empty when out of range
    pub fn at(&self, line: usize) -> &[IndexedNode<'a>] {
        self.lines.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Last line of a node's span.
///
/// Uses the node's own end line when it extends past the start line;
/// otherwise scans the subtree for the furthest end (or start) line, so that
/// trees carrying positions only on leaves still produce real spans.
pub fn resolve_end_line(node: &Node) -> usize {
    let Some(pos) = node.pos else {
        return 0;
    };
    if pos.end_line > pos.start_line {
        return pos.end_line;
    }

    node.pre_order()
        .filter_map(|n| n.pos)
        .map(|p| if p.end_line > p.start_line { p.end_line } else { p.start_line })
        .fold(pos.start_line, usize::max)
}
