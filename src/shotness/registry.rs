//! Node Registry
//!
//! Single owner of every unit's accumulated state. All mutation (touches,
//! renames, deletions, coupling updates, merging) goes through this type so
//! that coupling maps stay symmetric and the file index stays a faithful view
//! of the entries.
//!
//! ```text
//! NodeRegistry
//! ├── entries: key -> RegistryEntry { summary, count, couples: peer key -> n }
//! └── files:   file -> { keys }     derived, rebuildable from entries
//! ```

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::scanner::FileChange;
use crate::uast::Node;

use super::correlator::correlate;
use super::extractor::NodeExtractor;
use super::line_index::LineIndex;
use super::summary::NodeSummary;

/// Keys of the units touched during the commit being processed
pub type TouchSet = HashSet<String>;

/// Accumulated state of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub summary: NodeSummary,
    /// Number of distinct commits that touched this unit
    pub count: usize,
    /// Peer key -> number of commits touching both units
    pub couples: HashMap<String, usize>,
}

impl RegistryEntry {
    pub fn new(summary: NodeSummary) -> Self {
        Self {
            summary,
            count: 1,
            couples: HashMap::new(),
        }
    }
}

/// Identity-keyed store of unit counts and couplings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
    files: HashMap<String, BTreeSet<String>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a registry from its entries, rebuilding the file index
    pub fn from_entries(entries: HashMap<String, RegistryEntry>) -> Self {
        let mut registry = Self {
            entries,
            files: HashMap::new(),
        };
        registry.rebuild_file_index();
        registry
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &HashMap<String, RegistryEntry> {
        &self.entries
    }

    pub fn into_entries(self) -> HashMap<String, RegistryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of the units currently indexed under `file`
    pub fn keys_in_file(&self, file: &str) -> Option<&BTreeSet<String>> {
        self.files.get(file)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of directed coupling entries across all units
    pub fn coupling_edges(&self) -> usize {
        self.entries.values().map(|e| e.couples.len()).sum()
    }

    /// Mark a unit as touched by the current commit.
    ///
    /// A unit seen for the first time starts at count 1; otherwise the count
    /// grows by one unless the unit was already touched in this commit.
    pub fn touch(&mut self, name: &str, node: &Node, file: &str, touched: &mut TouchSet) {
        let summary = NodeSummary::new(node.node_type.as_str(), name, file);
        let key = summary.key();

        match self.entries.get_mut(&key) {
            Some(entry) => {
                if !touched.contains(&key) {
                    entry.count += 1;
                }
            }
            None => {
                trace!("New unit: {}", summary);
                self.files
                    .entry(file.to_string())
                    .or_default()
                    .insert(key.clone());
                self.entries.insert(key.clone(), RegistryEntry::new(summary));
            }
        }

        touched.insert(key);
    }

    /// Touch every unit of a newly added file
    pub fn handle_insertion(&mut self, extractor: &NodeExtractor, file: &str, after: &Node, touched: &mut TouchSet) {
        let nodes = extractor.extract(Some(after));
        for (name, node) in &nodes {
            self.touch(name, node, file, touched);
        }
    }

    /// Forget every unit of a deleted file, stripping it from its peers
    pub fn handle_deletion(&mut self, file: &str) {
        let Some(keys) = self.files.remove(file) else {
            return;
        };

        for key in &keys {
            if let Some(entry) = self.entries.remove(key) {
                for peer in entry.couples.keys() {
                    if let Some(peer_entry) = self.entries.get_mut(peer) {
                        peer_entry.couples.remove(key);
                    }
                }
            }
        }
        debug!("Deleted {} units of {}", keys.len(), file);
    }

    /// Apply a modified (possibly renamed) file: rename first, then touch
    /// every unit covering a changed line.
    pub fn handle_modification(&mut self, extractor: &NodeExtractor, change: &FileChange, touched: &mut TouchSet) {
        if change.is_rename() {
            self.apply_rename(&change.from, &change.to);
        }

        let Some(diff) = change.diff.as_ref() else {
            debug!("No line diff for {}, skipping correlation", change.to);
            return;
        };

        let before_nodes = extractor.extract(change.before.as_ref());
        let after_nodes = extractor.extract(change.after.as_ref());
        let before_index = LineIndex::build(&before_nodes, diff.old_lines);
        let after_index = LineIndex::build(&after_nodes, diff.new_lines);

        let file = change.to.as_str();
        correlate(diff, &before_index, &after_index, |name, node| {
            self.touch(name, node, file, touched);
        });
    }

    /// Move every unit of `old_file` to `new_file`, rewriting peer references.
    ///
    /// The full key remapping is computed before any entry is mutated, so
    /// units whose peers live in the same file are rewritten consistently.
    pub fn apply_rename(&mut self, old_file: &str, new_file: &str) {
        if old_file == new_file {
            return;
        }
        let Some(old_keys) = self.files.remove(old_file) else {
            return;
        };

        let remap: HashMap<String, String> = old_keys
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|entry| (key.clone(), entry.summary.relocated(new_file).key()))
            })
            .collect();

        let mut affected = BTreeSet::new();
        let mut moved = Vec::with_capacity(remap.len());
        for (old_key, new_key) in &remap {
            if let Some(mut entry) = self.entries.remove(old_key) {
                entry.summary.file = new_file.to_string();
                affected.extend(entry.couples.keys().map(|peer| remap.get(peer).unwrap_or(peer).clone()));
                affected.insert(new_key.clone());
                moved.push((new_key.clone(), entry));
            }
        }

        let bucket = self.files.entry(new_file.to_string()).or_default();
        for (new_key, entry) in moved {
            bucket.insert(new_key.clone());
            self.entries.insert(new_key, entry);
        }

        for key in &affected {
            if let Some(entry) = self.entries.get_mut(key) {
                if entry.couples.keys().any(|peer| remap.contains_key(peer)) {
                    entry.couples = std::mem::take(&mut entry.couples)
                        .into_iter()
                        .map(|(peer, count)| (remap.get(&peer).cloned().unwrap_or(peer), count))
                        .collect();
                }
            }
        }

        debug!("Renamed {} units from {} to {}", remap.len(), old_file, new_file);
    }

    /// Count one co-change for every ordered pair of touched units.
    ///
    /// Returns false without changing anything when more than `max_nodes`
    /// units were touched (0 disables the cap).
    pub fn update_couplings(&mut self, touched: &TouchSet, max_nodes: usize) -> bool {
        if max_nodes > 0 && touched.len() > max_nodes {
            debug!(
                "Skipping coupling update: {} units touched exceeds cap of {}",
                touched.len(),
                max_nodes
            );
            return false;
        }

        for key in touched {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            for peer in touched {
                if peer != key {
                    *entry.couples.entry(peer.clone()).or_insert(0) += 1;
                }
            }
        }
        true
    }

    /// Fold another registry's entries into this one by summing counts and
    /// couplings. The file index must be rebuilt afterwards.
    pub fn absorb(&mut self, other: NodeRegistry) {
        for (key, entry) in other.entries {
            match self.entries.get_mut(&key) {
                Some(existing) => {
                    existing.count += entry.count;
                    for (peer, count) in entry.couples {
                        *existing.couples.entry(peer).or_insert(0) += count;
                    }
                }
                None => {
                    self.entries.insert(key, entry);
                }
            }
        }
    }

    /// Recompute the file index from the entries
    pub fn rebuild_file_index(&mut self) {
        self.files.clear();
        for (key, entry) in &self.entries {
            self.files
                .entry(entry.summary.file.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// True when the file index exactly matches the entries' files
    pub fn file_index_consistent(&self) -> bool {
        let indexed: usize = self.files.values().map(BTreeSet::len).sum();
        indexed == self.entries.len()
            && self.files.iter().all(|(file, keys)| {
                keys.iter()
                    .all(|key| self.entries.get(key).is_some_and(|e| &e.summary.file == file))
            })
    }
}
