//! Unit identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a trackable unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeSummary {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub file: String,
}

impl NodeSummary {
    pub fn new(node_type: impl Into<String>, name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name: name.into(),
            file: file.into(),
        }
    }

    /// Registry key: `type_name_file`
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.node_type, self.name, self.file)
    }

    /// Same unit relocated to another file
    pub fn relocated(&self, file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.node_type, self.name, self.file)
    }
}
