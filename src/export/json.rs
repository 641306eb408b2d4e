//! JSON export implementation.
//!
//! Writes the diagram's node and edge lists for machine-readable output.

use super::Exporter;
use crate::render::Diagram;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    packages: usize,
    dependencies: usize,
    back_edges: usize,
    max_depth: usize,
    warnings: usize,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport<'a> {
    summary: JsonSummary,
    #[serde(flatten)]
    diagram: &'a Diagram,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, diagram: &Diagram, writer: &mut W) -> io::Result<()> {
        let export = JsonExport {
            summary: JsonSummary {
                packages: diagram.nodes.len(),
                dependencies: diagram.edges.len(),
                back_edges: diagram.edges.iter().filter(|e| e.is_back_edge).count(),
                max_depth: diagram.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
                warnings: diagram.nodes.iter().map(|n| n.warnings.len()).sum(),
            },
            diagram,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
