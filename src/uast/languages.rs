//! Source lowering into UAST
//!
//! Parses source text with tree-sitter and lowers the named nodes of the
//! concrete syntax tree into [`Node`]s. Function-like declarations are
//! normalised so the default structural query can find them in every
//! supported language:
//!
//! - type `Function` (free functions) or `Method` (members of impl/trait,
//!   class, or Go receiver methods)
//! - roles `Function` and `Declaration`, plus `Member` for methods
//! - `props.name` set from the grammar's `name` field
//!
//! Every other node keeps its tree-sitter kind as its type. Leaf nodes carry
//! their source text as token.

use log::{debug, trace};
use std::path::Path;
use tree_sitter::Parser;

use super::{Node, Positions};

/// Languages with a UAST lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    Rust,
    Python,
    Go,
}

impl SourceLanguage {
    /// Detect language by file extension
    pub fn from_path(path: &str) -> Option<Self> {
        let extension = Path::new(path).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "rs" => Some(SourceLanguage::Rust),
            "py" | "pyi" => Some(SourceLanguage::Python),
            "go" => Some(SourceLanguage::Go),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::Rust => "rust",
            SourceLanguage::Python => "python",
            SourceLanguage::Go => "go",
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            SourceLanguage::Rust => tree_sitter_rust::language(),
            SourceLanguage::Python => tree_sitter_python::language(),
            SourceLanguage::Go => tree_sitter_go::language(),
        }
    }

    fn is_function(&self, kind: &str) -> bool {
        match self {
            SourceLanguage::Rust => kind == "function_item",
            SourceLanguage::Python => kind == "function_definition",
            SourceLanguage::Go => matches!(kind, "function_declaration" | "method_declaration"),
        }
    }

    /// Containers whose direct function children are methods
    fn is_member_scope(&self, kind: &str) -> bool {
        match self {
            SourceLanguage::Rust => matches!(kind, "impl_item" | "trait_item"),
            SourceLanguage::Python => kind == "class_definition",
            SourceLanguage::Go => false,
        }
    }
}

/// Parse `source` and lower it to a UAST rooted at a `File` node.
///
/// Returns `None` when tree-sitter cannot produce a tree at all; syntax
/// errors inside the file still yield a (partial) tree.
pub fn parse_source(language: SourceLanguage, source: &str) -> Option<Node> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language.grammar()) {
        debug!("Failed to load {} grammar: {}", language.name(), e);
        return None;
    }

    let tree = parser.parse(source, None)?;
    let mut lowering = Lowering {
        language,
        source: source.as_bytes(),
        next_id: 0,
    };
    let mut root = lowering.lower(tree.root_node(), false);
    root.node_type = "File".to_string();
    trace!(
        "Lowered {} source into {} UAST nodes",
        language.name(),
        root.subtree_size()
    );
    Some(root)
}

struct Lowering<'s> {
    language: SourceLanguage,
    source: &'s [u8],
    next_id: u64,
}

impl<'s> Lowering<'s> {
    fn lower(&mut self, ts_node: tree_sitter::Node<'_>, in_member_scope: bool) -> Node {
        self.next_id += 1;
        let kind = ts_node.kind();
        let start = ts_node.start_position();
        let end = ts_node.end_position();

        let mut node = Node::new(kind).with_id(self.next_id);
        node.pos = Some(Positions {
            start_line: start.row + 1,
            start_col: start.column,
            start_offset: ts_node.start_byte(),
            end_line: end.row + 1,
            end_col: end.column,
            end_offset: ts_node.end_byte(),
        });

        if self.language.is_function(kind) {
            let is_method = in_member_scope || kind == "method_declaration";
            node.node_type = if is_method { "Method" } else { "Function" }.to_string();
            node.roles.push("Function".to_string());
            node.roles.push("Declaration".to_string());
            if is_method {
                node.roles.push("Member".to_string());
            }
            if let Some(name) = ts_node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(self.source).ok())
            {
                node.props.insert("name".to_string(), name.to_string());
            }
        }

        if ts_node.named_child_count() == 0 {
            if let Ok(text) = ts_node.utf8_text(self.source) {
                node.token = text.to_string();
            }
        }

        // impl/class bodies sit one level below the scope node itself
        let child_scope = self.language.is_member_scope(kind)
            || (in_member_scope
                && matches!(kind, "declaration_list" | "block" | "decorated_definition"));

        let mut cursor = ts_node.walk();
        for child in ts_node.named_children(&mut cursor) {
            node.children.push(self.lower(child, child_scope));
        }
        node
    }
}
