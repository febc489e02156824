//! Raw engine report
//!
//! Units are listed in key order; `counters[i][i]` is unit `i`'s change count
//! and `counters[i][j]` (i != j) its co-change count with unit `j`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::registry::RegistryEntry;
use super::summary::NodeSummary;

/// Statistics for one consumed commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub nodes_touched: usize,
    /// Unordered pairs among the touched units, whether or not they were counted
    pub coupling_pairs: usize,
}

impl CommitStats {
    pub fn for_touched(nodes_touched: usize) -> Self {
        Self {
            nodes_touched,
            coupling_pairs: nodes_touched * nodes_touched.saturating_sub(1) / 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    pub nodes: Vec<NodeSummary>,
    pub counters: Vec<BTreeMap<usize, usize>>,
    #[serde(default)]
    pub commit_stats: BTreeMap<String, CommitStats>,
}

impl RawReport {
    /// Build the index-based report from registry entries
    pub fn from_entries(entries: &HashMap<String, RegistryEntry>, commit_stats: BTreeMap<String, CommitStats>) -> Self {
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        let positions: HashMap<&str, usize> = keys
            .iter()
            .enumerate()
            .map(|(index, key)| (key.as_str(), index))
            .collect();

        let mut nodes = Vec::with_capacity(keys.len());
        let mut counters = Vec::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            let entry = &entries[*key];
            nodes.push(entry.summary.clone());

            let mut row = BTreeMap::new();
            row.insert(index, entry.count);
            for (peer, count) in &entry.couples {
                if let Some(&peer_index) = positions.get(peer.as_str()) {
                    row.insert(peer_index, *count);
                }
            }
            counters.push(row);
        }

        Self {
            nodes,
            counters,
            commit_stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Change count of unit `index`
    pub fn count(&self, index: usize) -> usize {
        self.counters
            .get(index)
            .and_then(|row| row.get(&index))
            .copied()
            .unwrap_or(0)
    }
}
