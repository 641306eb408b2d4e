//! Substring filtering of a built dependency graph.

use std::collections::HashMap;

use super::dependency_graph::DependencyGraph;

/// Keeps the root plus every node whose id contains `substring`, ignoring case.
///
/// Edges (back edges included) survive only when both endpoints survive.
/// An empty substring returns the graph unchanged. Discovery order, edge
/// order, depths, statuses, warnings and the completeness marker are kept.
///
/// # Example
///
/// ```rust
/// use nugraph::graph::{filter, DependencyGraph, PackageVersion};
///
/// let root = PackageVersion::new("App", "1.0.0");
/// let mut graph = DependencyGraph::new(root.clone());
/// graph.discover(&root, "Serilog", "3.1.1", PackageVersion::new("Serilog", "3.1.1"));
/// graph.discover(&root, "Polly", "8.2.0", PackageVersion::new("Polly", "8.2.0"));
///
/// let filtered = filter(&graph, "serilog");
/// assert_eq!(filtered.node_count(), 2);
/// assert!(filtered.find("Polly").is_none());
/// ```
pub fn filter(graph: &DependencyGraph, substring: &str) -> DependencyGraph {
    if substring.is_empty() {
        return graph.clone();
    }

    let needle = substring.to_lowercase();
    let root = graph.root;

    let filtered = graph.graph.filter_map(
        |idx, node| {
            let keep = idx == root || node.package.id.to_lowercase().contains(&needle);
            keep.then(|| node.clone())
        },
        |_, edge| Some(edge.clone()),
    );

    let node_indices: HashMap<_, _> = filtered
        .node_indices()
        .map(|idx| (filtered[idx].package.clone(), idx))
        .collect();
    let root = node_indices[graph.root()];

    DependencyGraph {
        graph: filtered,
        node_indices,
        root,
        complete: graph.complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeStatus, PackageVersion};

    fn pv(id: &str) -> PackageVersion {
        PackageVersion::new(id, "1.0.0")
    }

    /// App -> Microsoft.Extensions.Logging -> Microsoft.Extensions.Options
    ///     -> Serilog -> Microsoft.Extensions.Logging (back edge)
    fn sample_graph() -> DependencyGraph {
        let app = pv("App");
        let logging = pv("Microsoft.Extensions.Logging");
        let options = pv("Microsoft.Extensions.Options");
        let serilog = pv("Serilog");

        let mut graph = DependencyGraph::new(app.clone());
        graph.discover(&app, &logging.id, "1.0.0", logging.clone());
        graph.discover(&app, &serilog.id, "1.0.0", serilog.clone());
        graph.discover(&logging, &options.id, "1.0.0", options.clone());
        graph.discover(&serilog, &logging.id, "1.0.0", logging.clone());
        graph.add_warning(&serilog, "flaky");
        graph.set_status(&serilog, NodeStatus::Failed);
        graph
    }

    #[test]
    fn test_empty_substring_is_identity() {
        let graph = sample_graph();
        let filtered = filter(&graph, "");

        assert_eq!(filtered.node_count(), graph.node_count());
        assert_eq!(filtered.edge_count(), graph.edge_count());
        let before: Vec<_> = graph.nodes().map(|n| n.package.clone()).collect();
        let after: Vec<_> = filtered.nodes().map(|n| n.package.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_retained_nodes_match_case_insensitively() {
        let filtered = filter(&sample_graph(), "EXTENSIONS");

        let ids: Vec<_> = filtered.nodes().map(|n| n.package.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "App",
                "Microsoft.Extensions.Logging",
                "Microsoft.Extensions.Options"
            ]
        );
        for node in filtered.nodes().skip(1) {
            assert!(node.package.id.to_lowercase().contains("extensions"));
        }
    }

    #[test]
    fn test_root_kept_without_match() {
        let filtered = filter(&sample_graph(), "nothing-matches");

        assert_eq!(filtered.node_count(), 1);
        assert_eq!(filtered.root(), &pv("App"));
        assert_eq!(filtered.edge_count(), 0);
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let filtered = filter(&sample_graph(), "Logging");

        // App -> Logging survives; Serilog -> Logging does not
        assert_eq!(filtered.edge_count(), 1);
        assert!(filtered.back_edges().is_empty());
        assert_eq!(filtered.outgoing(&pv("App")).len(), 1);
    }

    #[test]
    fn test_back_edges_filtered_identically() {
        let filtered = filter(&sample_graph(), "o");

        // every non-root id contains an "o"
        assert_eq!(filtered.node_count(), 4);
        assert_eq!(filtered.back_edges().len(), 1);
        assert_eq!(filtered.back_edges()[0].from, pv("Serilog"));
    }

    #[test]
    fn test_metadata_survives_filtering() {
        let mut graph = sample_graph();
        graph.mark_incomplete();
        let filtered = filter(&graph, "serilog");

        let serilog = filtered.node(&pv("Serilog")).unwrap();
        assert_eq!(serilog.depth, 1);
        assert_eq!(serilog.status, NodeStatus::Failed);
        assert_eq!(serilog.warnings, vec!["flaky".to_string()]);
        assert!(!filtered.is_complete());
    }
}
