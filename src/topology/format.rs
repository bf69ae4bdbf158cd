//! Plain-text rendering of a topology for retrieval context.

use std::fmt::Write as _;

use super::types::{Neighbor, Topology};

const HEADING: &str = "[Drawing Topology]";

/// Render `topology` as a text block for prompt composition.
///
/// Returns an empty string for the skipped sentinel and for topologies without tags or
/// connectors. Output depends only on the topology value.
pub fn format_to_text(topology: &Topology) -> String {
    let Some(report) = topology.report() else {
        return String::new();
    };
    if report.is_empty() {
        return String::new();
    }

    let mut out = String::from(HEADING);
    out.push('\n');

    if !report.tags.is_empty() {
        out.push_str("Tags:\n");
        for tag in &report.tags {
            let _ = writeln!(out, "- {} | near: {}", tag.tag, format_neighbors(&tag.neighbors));
        }
    }

    if !report.connectors.is_empty() {
        out.push_str("Connectors:\n");
        for connector in &report.connectors {
            let _ = writeln!(
                out,
                "- {} -> {} | text: {}",
                connector.kind.label(),
                connector.reference,
                connector.text
            );
        }
    }

    out
}

fn format_neighbors(neighbors: &[Neighbor]) -> String {
    if neighbors.is_empty() {
        return "none".to_string();
    }
    neighbors
        .iter()
        .map(|neighbor| format!("{} (dist: {})", neighbor.text, format_distance(neighbor.distance)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Two decimals at most, one at least: `10.0`, `3.5`, `3.25`.
fn format_distance(distance: f64) -> String {
    let fixed = format!("{distance:.2}");
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
