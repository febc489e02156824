//! Text report generation

use colored::{ColoredString, Colorize};
use prettytable::{format, Cell, Row, Table};

use crate::metrics::{AggregateMetrics, ComputedMetrics, RiskLevel};

/// Rows shown per section by default
pub const DEFAULT_SECTION_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    /// Maximum rows per section
    pub limit: usize,
    pub colours: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SECTION_LIMIT,
            colours: false,
        }
    }
}

/// Format a compact table with headers and rows using prettytable-rs clean format
pub fn format_compact_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    if !headers.is_empty() {
        table.add_row(Row::new(headers.iter().map(|header| Cell::new(header)).collect()));
    }
    for row in rows {
        table.add_row(Row::new(row.iter().map(|cell| Cell::new(cell)).collect()));
    }

    // 2-space indent under section headings
    let mut result = String::new();
    for line in table.to_string().lines() {
        result.push_str("  ");
        result.push_str(line);
        result.push('\n');
    }
    result
}

fn paint(text: &str, colours: bool, style: fn(&str) -> ColoredString) -> String {
    if colours {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn heading(text: &str, colours: bool) -> String {
    paint(text, colours, |t| t.blue().bold())
}

fn risk_label(risk: RiskLevel, colours: bool) -> String {
    let label = risk.to_string();
    match risk {
        RiskLevel::High => paint(&label, colours, |t| t.red().bold()),
        RiskLevel::Medium => paint(&label, colours, |t| t.yellow()),
        RiskLevel::Low => label,
    }
}

fn more_line(out: &mut String, total: usize, limit: usize, colours: bool) {
    if total > limit {
        let text = format!("  ... and {} more", total - limit);
        out.push_str(&paint(&text, colours, |t| t.dimmed()));
        out.push('\n');
    }
}

fn summary_rows(agg: &AggregateMetrics, colours: bool) -> Vec<Vec<String>> {
    let hot = agg.hot_nodes.to_string();
    let hot = if agg.hot_nodes > 0 { paint(&hot, colours, |t| t.red()) } else { hot };
    vec![
        vec!["Total Nodes".to_string(), agg.total_nodes.to_string()],
        vec!["Total Changes".to_string(), agg.total_changes.to_string()],
        vec!["Avg Changes/Node".to_string(), format!("{:.1}", agg.avg_changes_per_node)],
        vec!["Total Couplings".to_string(), agg.total_couplings.to_string()],
        vec![
            "Avg Coupling Strength".to_string(),
            format!("{:.0}%", agg.avg_coupling_strength * 100.0),
        ],
        vec!["Hot Nodes".to_string(), hot],
    ]
}

/// Human-readable report with summary, hottest units, hotspots and couplings
pub fn render_text(metrics: &ComputedMetrics, options: &TextOptions) -> String {
    let colours = options.colours;
    let limit = options.limit;
    let mut out = String::new();

    out.push_str(&heading(
        &format!("Shotness Analysis ({} nodes)", metrics.aggregate.total_nodes),
        colours,
    ));
    out.push_str("\n\n");

    out.push_str(&heading("Summary", colours));
    out.push('\n');
    out.push_str(&format_compact_table(&[], &summary_rows(&metrics.aggregate, colours)));

    if !metrics.node_hotness.is_empty() {
        out.push('\n');
        out.push_str(&heading("Hottest Functions", colours));
        out.push('\n');
        let rows: Vec<Vec<String>> = metrics
            .node_hotness
            .iter()
            .take(limit)
            .map(|n| {
                vec![
                    n.name.clone(),
                    n.file.clone(),
                    n.change_count.to_string(),
                    format!("{:.2}", n.hotness_score),
                    n.coupled_nodes.to_string(),
                ]
            })
            .collect();
        out.push_str(&format_compact_table(&["Name", "File", "Changes", "Score", "Coupled"], &rows));
        more_line(&mut out, metrics.node_hotness.len(), limit, colours);
    }

    if !metrics.hotspot_nodes.is_empty() {
        out.push('\n');
        out.push_str(&heading("Risk Assessment", colours));
        out.push('\n');
        let rows: Vec<Vec<String>> = metrics
            .hotspot_nodes
            .iter()
            .take(limit)
            .map(|n| {
                vec![
                    n.name.clone(),
                    n.file.clone(),
                    n.change_count.to_string(),
                    risk_label(n.risk_level, colours),
                ]
            })
            .collect();
        out.push_str(&format_compact_table(&["Name", "File", "Changes", "Risk"], &rows));
        more_line(&mut out, metrics.hotspot_nodes.len(), limit, colours);
    }

    if !metrics.node_coupling.is_empty() {
        out.push('\n');
        out.push_str(&heading("Strongest Couplings", colours));
        out.push('\n');
        let rows: Vec<Vec<String>> = metrics
            .node_coupling
            .iter()
            .take(limit)
            .map(|c| {
                vec![
                    format!("{} ({})", c.node1_name, c.node1_file),
                    format!("{} ({})", c.node2_name, c.node2_file),
                    c.co_changes.to_string(),
                    format!("{:.0}%", c.coupling_strength * 100.0),
                ]
            })
            .collect();
        out.push_str(&format_compact_table(&["Unit", "Peer", "Co-changes", "Strength"], &rows));
        more_line(&mut out, metrics.node_coupling.len(), limit, colours);
    }

    out
}

fn flatten(prefix: &str, value: &serde_json::Value, rows: &mut Vec<Vec<String>>) {
    use serde_json::Value;

    let child_key = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten(&child_key(key), child, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten(&child_key(&index.to_string()), child, rows);
            }
        }
        Value::String(s) => rows.push(vec![prefix.to_string(), s.clone()]),
        other => rows.push(vec![prefix.to_string(), other.to_string()]),
    }
}

/// Key/value table for documents without a known layout
pub fn render_generic(value: &serde_json::Value, colours: bool) -> String {
    let mut rows = Vec::new();
    let is_empty = value.is_null()
        || value.as_object().is_some_and(|map| map.is_empty())
        || value.as_array().is_some_and(|items| items.is_empty());
    if !is_empty {
        flatten("", value, &mut rows);
    }

    let mut out = heading("Report", colours);
    out.push('\n');
    if rows.is_empty() {
        out.push_str("  (empty)\n");
    } else {
        out.push_str(&format_compact_table(&["Key", "Value"], &rows));
    }
    out
}
