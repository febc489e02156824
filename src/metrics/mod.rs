//! Hotness Metrics
//!
//! Pure computation over a [`RawReport`]. Runs once at the end of an analysis
//! and never touches the engine state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shotness::{NodeSummary, RawReport};

/// Change count at or above which a unit is a HIGH risk hotspot
pub const HOTSPOT_THRESHOLD_HIGH: usize = 20;
/// Change count at or above which a unit is a MEDIUM risk hotspot
pub const HOTSPOT_THRESHOLD_MEDIUM: usize = 10;

/// Change frequency of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHotness {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub file: String,
    pub change_count: usize,
    /// Number of distinct peers this unit changed together with
    pub coupled_nodes: usize,
    /// Change count relative to the most changed unit, in [0, 1]
    pub hotness_score: f64,
}

/// Co-change relationship between two units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCoupling {
    pub node1_name: String,
    pub node1_file: String,
    pub node2_name: String,
    pub node2_file: String,
    pub co_changes: usize,
    pub coupling_strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn classify(change_count: usize) -> Self {
        if change_count >= HOTSPOT_THRESHOLD_HIGH {
            RiskLevel::High
        } else if change_count >= HOTSPOT_THRESHOLD_MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn is_hot(&self) -> bool {
        *self >= RiskLevel::Medium
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{}", label)
    }
}

/// Frequently changing unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub file: String,
    pub change_count: usize,
    pub risk_level: RiskLevel,
}

/// Summary statistics over all units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_nodes: usize,
    pub total_changes: usize,
    /// Unordered unit pairs with a nonzero co-change count
    pub total_couplings: usize,
    pub avg_changes_per_node: f64,
    pub avg_coupling_strength: f64,
    pub hot_nodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedMetrics {
    pub node_hotness: Vec<NodeHotness>,
    pub node_coupling: Vec<NodeCoupling>,
    pub hotspot_nodes: Vec<HotspotNode>,
    pub aggregate: AggregateMetrics,
}

/// `c / max(c, a, b)`; 0 when every input is 0
pub fn coupling_strength(co_changes: usize, count_a: usize, count_b: usize) -> f64 {
    let max = co_changes.max(count_a).max(count_b);
    if max == 0 {
        0.0
    } else {
        co_changes as f64 / max as f64
    }
}

/// `count / max_count`; 0 when `max_count` is 0
pub fn hotness_score(count: usize, max_count: usize) -> f64 {
    if max_count == 0 {
        0.0
    } else {
        count as f64 / max_count as f64
    }
}

/// Compute every metric from a raw report
pub fn compute(report: &RawReport) -> ComputedMetrics {
    let node_coupling = node_coupling(report);
    ComputedMetrics {
        node_hotness: node_hotness(report),
        hotspot_nodes: hotspot_nodes(report),
        aggregate: aggregate(report, &node_coupling),
        node_coupling,
    }
}

/// Units that have a counter row, paired with their index
fn indexed_units(report: &RawReport) -> impl Iterator<Item = (usize, &NodeSummary)> {
    report
        .nodes
        .iter()
        .enumerate()
        .filter(move |(index, _)| *index < report.counters.len())
}

/// Per-unit hotness, most changed first
pub fn node_hotness(report: &RawReport) -> Vec<NodeHotness> {
    let max_count = (0..report.counters.len())
        .map(|i| report.count(i))
        .max()
        .unwrap_or(0);

    let mut result: Vec<NodeHotness> = indexed_units(report)
        .map(|(index, node)| {
            let change_count = report.count(index);
            NodeHotness {
                name: node.name.clone(),
                node_type: node.node_type.clone(),
                file: node.file.clone(),
                change_count,
                coupled_nodes: report.counters[index].len().saturating_sub(1),
                hotness_score: hotness_score(change_count, max_count),
            }
        })
        .collect();

    result.sort_by(|a, b| b.change_count.cmp(&a.change_count));
    result
}

/// Each nonzero pair once, strongest co-change first
pub fn node_coupling(report: &RawReport) -> Vec<NodeCoupling> {
    let mut result = Vec::new();

    for (i, row) in report.counters.iter().enumerate() {
        let Some(node1) = report.nodes.get(i) else {
            continue;
        };
        for (&j, &co_changes) in row.range(i + 1..) {
            if co_changes == 0 {
                continue;
            }
            let Some(node2) = report.nodes.get(j) else {
                continue;
            };
            result.push(NodeCoupling {
                node1_name: node1.name.clone(),
                node1_file: node1.file.clone(),
                node2_name: node2.name.clone(),
                node2_file: node2.file.clone(),
                co_changes,
                coupling_strength: coupling_strength(co_changes, report.count(i), report.count(j)),
            });
        }
    }

    result.sort_by(|a, b| b.co_changes.cmp(&a.co_changes));
    result
}

/// Units at MEDIUM risk or above, most changed first
pub fn hotspot_nodes(report: &RawReport) -> Vec<HotspotNode> {
    let mut result: Vec<HotspotNode> = indexed_units(report)
        .filter_map(|(index, node)| {
            let change_count = report.count(index);
            let risk_level = RiskLevel::classify(change_count);
            risk_level.is_hot().then(|| HotspotNode {
                name: node.name.clone(),
                node_type: node.node_type.clone(),
                file: node.file.clone(),
                change_count,
                risk_level,
            })
        })
        .collect();

    result.sort_by(|a, b| b.change_count.cmp(&a.change_count));
    result
}

fn aggregate(report: &RawReport, couplings: &[NodeCoupling]) -> AggregateMetrics {
    let counts: Vec<usize> = (0..report.counters.len()).map(|i| report.count(i)).collect();
    let total_changes: usize = counts.iter().sum();
    let hot_nodes = counts
        .iter()
        .filter(|&&count| RiskLevel::classify(count).is_hot())
        .count();

    let total_nodes = report.nodes.len();
    let avg_changes_per_node = if total_nodes > 0 {
        total_changes as f64 / total_nodes as f64
    } else {
        0.0
    };
    let avg_coupling_strength = if couplings.is_empty() {
        0.0
    } else {
        couplings.iter().map(|c| c.coupling_strength).sum::<f64>() / couplings.len() as f64
    };

    AggregateMetrics {
        total_nodes,
        total_changes,
        total_couplings: couplings.len(),
        avg_changes_per_node,
        avg_coupling_strength,
        hot_nodes,
    }
}
