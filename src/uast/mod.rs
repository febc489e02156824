//! Universal Abstract Syntax Tree
//!
//! Language-neutral syntax tree consumed by the shotness engine. Source files
//! are lowered into this shape by [`languages`] and queried through the
//! [`query::QueryEngine`] seam.
//!
//! ```text
//! Node
//! ├── id, type, token
//! ├── roles        ("Function", "Declaration", ...)
//! ├── props        (name -> value, e.g. "name" -> "parse_args")
//! ├── pos          (1-based lines, 0-based columns, byte offsets)
//! └── children     (owned, in source order)
//! ```

pub mod languages;
pub mod query;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use languages::{parse_source, SourceLanguage};
pub use query::{DslQueryEngine, QueryEngine, QueryError, QueryResult};

/// Source span of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positions {
    pub start_line: usize,
    pub start_col: usize,
    pub start_offset: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub end_offset: usize,
}

impl Positions {
    /// Span covering whole lines only
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            ..Self::default()
        }
    }
}

/// A UAST node owning its children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
    #[serde(default)]
    pub pos: Option<Positions>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_lines(mut self, start_line: usize, end_line: usize) -> Self {
        self.pos = Some(Positions::lines(start_line, end_line));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Pre-order traversal starting at (and including) this node
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Total number of nodes in this subtree
    pub fn subtree_size(&self) -> usize {
        self.pre_order().count()
    }
}

/// Iterator produced by [`Node::pre_order`]
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
