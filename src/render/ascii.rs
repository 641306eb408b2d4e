//! ASCII tree rendering of a dependency graph.
//!
//! Output looks like:
//!
//! ```text
//! Foo 1.0.0
//! ├── Bar 1.0.0
//! └── Baz 1.0.0
//!     └── Bar 1.0.0 (already shown)
//! ```

use std::collections::HashSet;

use crate::graph::{DependencyGraph, PackageNode, PackageVersion};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Marker printed instead of expanding a package a second time.
pub const ALREADY_SHOWN: &str = "(already shown)";

/// Marker appended to trees of cancelled resolutions.
pub const INCOMPLETE: &str = "(incomplete: resolution was cancelled)";

/// Renders the graph as a tree rooted at the analyzed package.
///
/// Children follow edge insertion order. A package reached a second time is
/// printed as a leaf marked "(already shown)", so cycles and diamonds never
/// repeat a subtree. The output is identical for identical graphs.
///
/// # Example
///
/// ```rust
/// use nugraph::graph::{DependencyGraph, PackageVersion};
/// use nugraph::render::render_ascii_tree;
///
/// let a = PackageVersion::new("A", "1.0.0");
/// let b = PackageVersion::new("B", "2.0.0");
/// let mut graph = DependencyGraph::new(a.clone());
/// graph.discover(&a, "B", "latest", b.clone());
/// graph.discover(&b, "A", "1.0.0", a.clone());
///
/// assert_eq!(
///     render_ascii_tree(&graph),
///     "A 1.0.0\n└── B 2.0.0\n    └── A 1.0.0 (already shown)\n"
/// );
/// ```
pub fn render_ascii_tree(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    let mut shown = HashSet::new();

    let root = graph.root_node();
    out.push_str(&label(root));
    out.push('\n');
    shown.insert(root.package.clone());

    let mut prefix = String::new();
    render_children(graph, &root.package, &mut prefix, &mut shown, &mut out);

    if !graph.is_complete() {
        out.push_str(INCOMPLETE);
        out.push('\n');
    }
    out
}

fn render_children(
    graph: &DependencyGraph,
    package: &PackageVersion,
    prefix: &mut String,
    shown: &mut HashSet<PackageVersion>,
    out: &mut String,
) {
    let edges = graph.outgoing(package);
    let count = edges.len();

    for (i, edge) in edges.into_iter().enumerate() {
        let Some(child) = graph.node(&edge.to) else {
            continue;
        };
        let is_last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last { LAST_BRANCH } else { BRANCH });

        if !shown.insert(child.package.clone()) {
            out.push_str(&format!(
                "{} {} {}\n",
                child.package.id, child.package.version, ALREADY_SHOWN
            ));
            continue;
        }

        out.push_str(&label(child));
        out.push('\n');

        let len = prefix.len();
        prefix.push_str(if is_last { SPACE } else { PIPE });
        render_children(graph, &child.package, prefix, shown, out);
        prefix.truncate(len);
    }
}

fn label(node: &PackageNode) -> String {
    let mut line = format!("{} {}", node.package.id, node.package.version);
    if node.has_warnings() {
        line.push_str(&format!(" [warning: {}]", node.warnings.join("; ")));
    }
    line
}
