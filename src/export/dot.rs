//! Graphviz DOT export implementation.

use super::Exporter;
use crate::render::Diagram;
use std::io::{self, Write};

/// DOT exporter implementation.
pub struct DotExporter;

impl Exporter for DotExporter {
    fn export<W: Write>(&self, diagram: &Diagram, writer: &mut W) -> io::Result<()> {
        writer.write_all(to_dot(diagram).as_bytes())
    }
}

/// Renders the diagram as a DOT digraph.
///
/// The root is drawn bold, packages with warnings in red, and back edges
/// dashed. Nodes are ranked top to bottom by discovery order.
pub fn to_dot(diagram: &Diagram) -> String {
    let mut out = String::new();
    out.push_str("digraph dependencies {\n");
    out.push_str("    rankdir=TB;\n");
    out.push_str("    node [shape=box, fontname=\"Helvetica\"];\n");

    for node in &diagram.nodes {
        let key = node.key();
        let mut attrs = vec![format!("label=\"{}\\n{}\"", escape(&node.id), escape(&node.version))];
        if key == diagram.root {
            attrs.push("style=bold".to_string());
        }
        if !node.warnings.is_empty() {
            attrs.push("color=red".to_string());
            attrs.push(format!("tooltip=\"{}\"", escape(&node.warnings.join("; "))));
        }
        out.push_str(&format!("    \"{}\" [{}];\n", escape(&key), attrs.join(", ")));
    }

    for edge in &diagram.edges {
        let style = if edge.is_back_edge { " [style=dashed]" } else { "" };
        out.push_str(&format!(
            "    \"{}\" -> \"{}\"{};\n",
            escape(&edge.from),
            escape(&edge.to),
            style
        ));
    }

    out.push_str("}\n");
    out
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
