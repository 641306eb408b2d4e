//! Renderer-agnostic node/edge projection of a dependency graph.

use serde::Serialize;

use crate::graph::{DependencyGraph, PackageVersion};

/// A graph ready to be drawn by an external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagram {
    /// `id@version` of the analyzed package
    pub root: String,
    /// False when resolution was cancelled
    pub complete: bool,
    /// Packages in discovery order
    pub nodes: Vec<DiagramNode>,
    /// Dependencies in insertion order
    pub edges: Vec<DiagramEdge>,
}

/// A package in a [`Diagram`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub version: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DiagramNode {
    /// The `id@version` key edges refer to.
    pub fn key(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}

/// A dependency in a [`Diagram`]; endpoints are `id@version` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub is_back_edge: bool,
}

/// Projects the graph into plain node and edge lists.
///
/// # Example
///
/// ```rust
/// use nugraph::graph::{DependencyGraph, PackageVersion};
/// use nugraph::render::render_diagram;
///
/// let foo = PackageVersion::new("Foo", "1.0.0");
/// let mut graph = DependencyGraph::new(foo.clone());
/// graph.discover(&foo, "Bar", "latest", PackageVersion::new("Bar", "2.0.0"));
///
/// let diagram = render_diagram(&graph);
/// assert_eq!(diagram.nodes.len(), 2);
/// assert_eq!(diagram.edges[0].from, "Foo@1.0.0");
/// assert_eq!(diagram.edges[0].to, "Bar@2.0.0");
/// ```
pub fn render_diagram(graph: &DependencyGraph) -> Diagram {
    let nodes = graph
        .nodes()
        .map(|node| DiagramNode {
            id: node.package.id.clone(),
            version: node.package.version.clone(),
            depth: node.depth,
            warnings: node.warnings.clone(),
        })
        .collect();

    // endpoints use the stored node's spelling so edge keys always match node keys
    let key = |package: &PackageVersion| {
        graph
            .node(package)
            .map_or_else(|| package.to_string(), |node| node.package.to_string())
    };
    let edges = graph
        .edges()
        .map(|edge| DiagramEdge {
            from: key(&edge.from),
            to: key(&edge.to),
            is_back_edge: edge.is_back_edge,
        })
        .collect();

    Diagram {
        root: graph.root().to_string(),
        complete: graph.is_complete(),
        nodes,
        edges,
    }
}
