//! Node Extractor
//!
//! Selects the trackable units of one file revision with a structural query
//! and names each of them with a name query. Query failures never abort a
//! scan: the revision simply contributes no units.

use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::uast::{DslQueryEngine, Node, QueryEngine, QueryResult};

/// Default structural query: every function or method, however nested
pub const DEFAULT_STRUCT_QUERY: &str = r#"rfilter(.roles has "Function")"#;

/// Default name query
pub const DEFAULT_NAME_QUERY: &str = ".props.name";

/// Units of one file revision, keyed by resolved name
pub type ExtractedNodes<'a> = BTreeMap<String, &'a Node>;

/// Runs the configured queries against file revisions
#[derive(Clone)]
pub struct NodeExtractor {
    engine: Arc<dyn QueryEngine>,
    struct_query: String,
    name_query: String,
}

impl NodeExtractor {
    pub fn new(engine: Arc<dyn QueryEngine>, struct_query: impl Into<String>, name_query: impl Into<String>) -> Self {
        Self {
            engine,
            struct_query: struct_query.into(),
            name_query: name_query.into(),
        }
    }

    /// Extractor backed by the built-in DSL; both queries are compiled up front
    pub fn with_dsl(struct_query: impl Into<String>, name_query: impl Into<String>) -> QueryResult<Self> {
        let struct_query = struct_query.into();
        let name_query = name_query.into();
        let engine = DslQueryEngine::compile(&struct_query, &name_query)?;
        Ok(Self::new(Arc::new(engine), struct_query, name_query))
    }

    /// Extractor with the built-in DSL and default queries
    pub fn with_defaults() -> QueryResult<Self> {
        Self::with_dsl(DEFAULT_STRUCT_QUERY, DEFAULT_NAME_QUERY)
    }

    pub fn struct_query(&self) -> &str {
        &self.struct_query
    }

    pub fn name_query(&self) -> &str {
        &self.name_query
    }

    /// Extract named units from a revision's tree.
    ///
    /// A missing root yields nothing. When two units resolve to the same
    /// name, the later one in query order wins.
    pub fn extract<'a>(&self, root: Option<&'a Node>) -> ExtractedNodes<'a> {
        let mut result = ExtractedNodes::new();
        let Some(root) = root else {
            return result;
        };

        let candidates = match self.engine.select(root) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!("Structural query failed, revision contributes no units: {}", e);
                return result;
            }
        };

        for node in candidates {
            let name = match self.engine.resolve_name(node) {
                Ok(Some(name)) if !name.is_empty() => name,
                Ok(_) => node.token.clone(),
                Err(e) => {
                    debug!("Name query failed for node {}, using its token: {}", node.id, e);
                    node.token.clone()
                }
            };
            result.insert(name, node);
        }

        result
    }
}

impl std::fmt::Debug for NodeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeExtractor")
            .field("struct_query", &self.struct_query)
            .field("name_query", &self.name_query)
            .finish()
    }
}
