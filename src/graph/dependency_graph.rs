//! Dependency graph implementation using petgraph.
//!
//! Nodes are resolved package versions, edges are dependency declarations.
//! Each package version is inserted at most once, at the depth where it was
//! first discovered; later references to it become back edges.

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A concrete, resolved `(id, version)` identity of a published package.
///
/// Package ids compare case-insensitively, versions compare exactly.
///
/// # Example
///
/// ```rust
/// use nugraph::graph::PackageVersion;
///
/// let a = PackageVersion::new("Newtonsoft.Json", "13.0.3");
/// let b = PackageVersion::new("newtonsoft.json", "13.0.3");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "Newtonsoft.Json@13.0.3");
/// ```
#[derive(Debug, Clone, Eq)]
pub struct PackageVersion {
    /// Package id as it was requested (e.g., "Newtonsoft.Json")
    pub id: String,
    /// Concrete version string (e.g., "13.0.3")
    pub version: String,
}

impl PackageVersion {
    /// Creates a new package version.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Returns true if `id` names this package, ignoring case.
    pub fn is_package(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.id.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// What happened to a node during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeStatus {
    /// Not expanded: the depth bound was reached or traversal stopped early
    #[default]
    Leaf,
    /// Dependencies were fetched and attached as outgoing edges
    Expanded,
    /// Fetching the dependency list failed; kept as a leaf with a warning
    Failed,
    /// The requested selector matched no published version
    Unresolved,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Expanded => write!(f, "expanded"),
            Self::Failed => write!(f, "failed"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Resolution metadata for a single package version in the graph.
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// The package version this node stands for
    pub package: PackageVersion,
    /// Depth at which the package was first discovered (root = 0)
    pub depth: usize,
    /// Traversal outcome for this node
    pub status: NodeStatus,
    /// Non-fatal problems absorbed while resolving this node
    pub warnings: Vec<String>,
}

impl PackageNode {
    /// Creates a new node at the given depth.
    pub fn new(package: PackageVersion, depth: usize) -> Self {
        Self {
            package,
            depth,
            status: NodeStatus::default(),
            warnings: Vec::new(),
        }
    }

    /// Returns true if this node carries warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A dependency declaration from one package version to another package.
///
/// `requested_version` is the selector as declared by `from`; `to` is what
/// that selector resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// The dependent package version
    pub from: PackageVersion,
    /// Id of the dependency as declared
    pub to_id: String,
    /// Version selector as declared (exact version, range or "latest")
    pub requested_version: String,
    /// The package version the selector resolved to
    pub to: PackageVersion,
    /// Whether `to` was already in the graph when this edge was added
    pub is_back_edge: bool,
}

/// Outcome of [`DependencyGraph::discover`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// The target was inserted as a new node and should be expanded
    New,
    /// The target already existed; the edge was recorded as a back edge
    Revisit,
}

/// A directed graph of resolved package versions rooted at one package.
///
/// The graph uses petgraph's `DiGraph` internally. Node indices follow
/// discovery order and edge indices follow insertion order, which keeps
/// every traversal and rendering deterministic.
///
/// # Example
///
/// ```rust
/// use nugraph::graph::{DependencyGraph, Discovery, PackageVersion};
///
/// let foo = PackageVersion::new("Foo", "1.0.0");
/// let bar = PackageVersion::new("Bar", "2.0.0");
///
/// let mut graph = DependencyGraph::new(foo.clone());
/// assert_eq!(graph.discover(&foo, "Bar", "latest", bar.clone()), Some(Discovery::New));
/// assert_eq!(graph.discover(&foo, "Bar", "2.0.0", bar.clone()), Some(Discovery::Revisit));
///
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 2);
/// assert_eq!(graph.back_edges().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph
    pub(super) graph: DiGraph<PackageNode, DependencyEdge>,
    /// Maps package versions to their node indices for O(1) lookup
    pub(super) node_indices: HashMap<PackageVersion, NodeIndex>,
    /// Index of the analyzed package
    pub(super) root: NodeIndex,
    /// False when traversal was cancelled before finishing
    pub(super) complete: bool,
}

impl DependencyGraph {
    /// Creates a graph holding only `root` at depth 0.
    pub fn new(root: PackageVersion) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let idx = graph.add_node(PackageNode::new(root.clone(), 0));
        node_indices.insert(root, idx);
        Self {
            graph,
            node_indices,
            root: idx,
            complete: true,
        }
    }

    /// Returns the analyzed package version.
    pub fn root(&self) -> &PackageVersion {
        &self.graph[self.root].package
    }

    /// Returns the root node.
    pub fn root_node(&self) -> &PackageNode {
        &self.graph[self.root]
    }

    /// Records that `from` depends on `to_id` (declared as `requested`),
    /// which resolved to `to`.
    ///
    /// If `to` is not yet in the graph it is inserted one level below `from`.
    /// Otherwise the edge is recorded as a back edge and the existing node,
    /// including its depth, is left untouched.
    ///
    /// Returns `None` if `from` is not in the graph.
    pub fn discover(
        &mut self,
        from: &PackageVersion,
        to_id: &str,
        requested: &str,
        to: PackageVersion,
    ) -> Option<Discovery> {
        let from_idx = *self.node_indices.get(from)?;

        let (to_idx, discovery) = match self.node_indices.get(&to) {
            Some(&idx) => (idx, Discovery::Revisit),
            None => {
                let depth = self.graph[from_idx].depth + 1;
                let idx = self.graph.add_node(PackageNode::new(to.clone(), depth));
                self.node_indices.insert(to.clone(), idx);
                (idx, Discovery::New)
            }
        };

        let edge = DependencyEdge {
            from: self.graph[from_idx].package.clone(),
            to_id: to_id.to_string(),
            requested_version: requested.to_string(),
            to,
            is_back_edge: discovery == Discovery::Revisit,
        };
        self.graph.add_edge(from_idx, to_idx, edge);

        Some(discovery)
    }

    /// Gets a node by package version.
    pub fn node(&self, package: &PackageVersion) -> Option<&PackageNode> {
        self.node_indices
            .get(package)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    fn node_mut(&mut self, package: &PackageVersion) -> Option<&mut PackageNode> {
        self.node_indices
            .get(package)
            .and_then(|&idx| self.graph.node_weight_mut(idx))
    }

    /// Finds a node by package id alone, ignoring case.
    ///
    /// Returns the first match in discovery order.
    pub fn find(&self, id: &str) -> Option<&PackageNode> {
        self.nodes().find(|node| node.package.is_package(id))
    }

    /// Checks if a package version exists in the graph.
    pub fn contains(&self, package: &PackageVersion) -> bool {
        self.node_indices.contains_key(package)
    }

    /// Sets the traversal status of a node. Returns false if it is absent.
    pub fn set_status(&mut self, package: &PackageVersion, status: NodeStatus) -> bool {
        match self.node_mut(package) {
            Some(node) => {
                node.status = status;
                true
            }
            None => false,
        }
    }

    /// Attaches a non-fatal warning to a node. Returns false if it is absent.
    pub fn add_warning(&mut self, package: &PackageVersion, warning: impl Into<String>) -> bool {
        match self.node_mut(package) {
            Some(node) => {
                node.warnings.push(warning.into());
                true
            }
            None => false,
        }
    }

    /// Turns an `Unresolved` placeholder into a real, not yet expanded node.
    ///
    /// Placeholders are keyed by the declared selector, which can equal a
    /// version that resolves later. Returns true if a placeholder was upgraded;
    /// its warnings are dropped and its depth is kept.
    pub fn promote_unresolved(&mut self, resolved: &PackageVersion) -> bool {
        match self.node_mut(resolved) {
            Some(node) if node.status == NodeStatus::Unresolved => {
                node.package = resolved.clone();
                node.status = NodeStatus::Leaf;
                node.warnings.clear();
                true
            }
            _ => false,
        }
    }

    /// Gets the outgoing edges of a package version in insertion order.
    pub fn outgoing(&self, package: &PackageVersion) -> Vec<&DependencyEdge> {
        let Some(&idx) = self.node_indices.get(package) else {
            return Vec::new();
        };

        // petgraph yields adjacency lists newest first
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .collect();
        edges.sort_by_key(|edge| edge.id());
        edges.into_iter().map(|edge| edge.weight()).collect()
    }

    /// Gets all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_weights()
    }

    /// Gets the edges whose target already existed when they were added.
    pub fn back_edges(&self) -> Vec<&DependencyEdge> {
        self.edges().filter(|edge| edge.is_back_edge).collect()
    }

    /// Gets all nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.graph.node_weights()
    }

    /// Gets nodes at a specific depth.
    pub fn nodes_at_depth(&self, depth: usize) -> Vec<&PackageNode> {
        self.nodes().filter(|node| node.depth == depth).collect()
    }

    /// Returns the deepest recorded depth.
    pub fn max_depth(&self) -> usize {
        self.nodes().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Returns all warnings with the package they belong to.
    pub fn warnings(&self) -> Vec<(&PackageVersion, &str)> {
        self.nodes()
            .flat_map(|node| {
                node.warnings
                    .iter()
                    .map(move |warning| (&node.package, warning.as_str()))
            })
            .collect()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns false if traversal stopped before the graph was fully built.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Marks the graph as partially built.
    pub fn mark_incomplete(&mut self) {
        self.complete = false;
    }

    /// Checks if the underlying dependency relation contains cycles.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nugraph::graph::{DependencyGraph, PackageVersion};
    ///
    /// let a = PackageVersion::new("A", "1.0.0");
    /// let b = PackageVersion::new("B", "1.0.0");
    /// let mut graph = DependencyGraph::new(a.clone());
    /// graph.discover(&a, "B", "1.0.0", b.clone());
    /// graph.discover(&b, "A", "1.0.0", a.clone());
    ///
    /// assert!(graph.has_cycles());
    /// ```
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Detects and returns all cycles in the graph.
    ///
    /// Uses Tarjan's algorithm; a strongly connected component forms a cycle
    /// if it has more than one node or a single node with a self-loop.
    pub fn detect_cycles(&self) -> Vec<CycleInfo> {
        let mut cycles = Vec::new();

        for scc in tarjan_scc(&self.graph) {
            let is_cycle = scc.len() > 1
                || (scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]));
            if !is_cycle {
                continue;
            }

            let mut members = scc;
            members.sort();
            cycles.push(CycleInfo {
                nodes: members
                    .into_iter()
                    .map(|idx| self.graph[idx].package.to_string())
                    .collect(),
            });
        }

        cycles
    }
}

/// Information about a detected circular dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// The packages in the cycle (the last connects back to the first)
    pub nodes: Vec<String>,
}

impl CycleInfo {
    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a -> b -> c -> a"
    pub fn cycle_path(&self) -> String {
        let Some(first) = self.nodes.first() else {
            return String::new();
        };
        format!("{} -> {}", self.nodes.join(" -> "), first)
    }

    /// Returns the number of packages in the cycle.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the cycle is empty (should not happen in practice).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pv(id: &str, version: &str) -> PackageVersion {
        PackageVersion::new(id, version)
    }

    #[test]
    fn test_new_graph_has_root_at_depth_zero() {
        let graph = DependencyGraph::new(pv("Foo", "1.0.0"));

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.root(), &pv("Foo", "1.0.0"));
        assert_eq!(graph.root_node().depth, 0);
        assert!(graph.is_complete());
    }

    #[test]
    fn test_promote_unresolved_placeholder() {
        let foo = pv("Foo", "1.0.0");
        let placeholder = pv("bar", "1.0.0");
        let mut graph = DependencyGraph::new(foo.clone());
        graph.discover(&foo, "bar", "1.0.0", placeholder.clone());
        graph.set_status(&placeholder, NodeStatus::Unresolved);
        graph.add_warning(&placeholder, "registry unavailable: timeout");

        assert!(graph.promote_unresolved(&pv("Bar", "1.0.0")));
        let node = graph.node(&placeholder).unwrap();
        assert_eq!(node.status, NodeStatus::Leaf);
        assert_eq!(node.package.id, "Bar");
        assert!(node.warnings.is_empty());

        // only placeholders are upgraded
        assert!(!graph.promote_unresolved(&pv("Bar", "1.0.0")));
        assert!(!graph.promote_unresolved(&pv("Missing", "1.0.0")));
    }

    #[test]
    fn test_package_version_identity_ignores_id_case() {
        let mut map = HashMap::new();
        map.insert(pv("Newtonsoft.Json", "13.0.1"), 1);

        assert!(map.contains_key(&pv("NEWTONSOFT.JSON", "13.0.1")));
        assert!(!map.contains_key(&pv("Newtonsoft.Json", "13.0.1-beta")));
        assert_ne!(pv("a", "1.0.0"), pv("a", "1.0.0.0"));
    }

    #[test]
    fn test_discover_assigns_depth_from_parent() {
        let foo = pv("Foo", "1.0.0");
        let bar = pv("Bar", "1.0.0");
        let baz = pv("Baz", "1.0.0");

        let mut graph = DependencyGraph::new(foo.clone());
        assert_eq!(
            graph.discover(&foo, "Bar", "1.0.0", bar.clone()),
            Some(Discovery::New)
        );
        assert_eq!(
            graph.discover(&bar, "Baz", "latest", baz.clone()),
            Some(Discovery::New)
        );

        assert_eq!(graph.node(&bar).unwrap().depth, 1);
        assert_eq!(graph.node(&baz).unwrap().depth, 2);
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(graph.nodes_at_depth(1).len(), 1);
    }

    #[test]
    fn test_revisit_keeps_first_depth() {
        let foo = pv("Foo", "1.0.0");
        let bar = pv("Bar", "1.0.0");
        let baz = pv("Baz", "1.0.0");

        let mut graph = DependencyGraph::new(foo.clone());
        graph.discover(&foo, "Bar", "1.0.0", bar.clone());
        graph.discover(&bar, "Baz", "1.0.0", baz.clone());
        assert_eq!(
            graph.discover(&foo, "Baz", "1.0.0", baz.clone()),
            Some(Discovery::Revisit)
        );

        assert_eq!(graph.node(&baz).unwrap().depth, 2);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.back_edges().len(), 1);
        assert_eq!(graph.back_edges()[0].from, foo);
    }

    #[test]
    fn test_discover_from_missing_node() {
        let mut graph = DependencyGraph::new(pv("Foo", "1.0.0"));
        let result = graph.discover(&pv("Nope", "1.0.0"), "Bar", "1.0.0", pv("Bar", "1.0.0"));

        assert_eq!(result, None);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_outgoing_preserves_insertion_order() {
        let root = pv("Root", "1.0.0");
        let mut graph = DependencyGraph::new(root.clone());
        for name in ["c", "a", "b"] {
            graph.discover(&root, name, "1.0.0", pv(name, "1.0.0"));
        }

        let order: Vec<_> = graph
            .outgoing(&root)
            .iter()
            .map(|edge| edge.to_id.as_str())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!(graph.outgoing(&root).iter().all(|edge| edge.from == root));
    }

    #[test]
    fn test_status_and_warnings() {
        let foo = pv("Foo", "1.0.0");
        let mut graph = DependencyGraph::new(foo.clone());

        assert!(graph.set_status(&foo, NodeStatus::Failed));
        assert!(graph.add_warning(&foo, "registry unavailable"));
        assert!(!graph.add_warning(&pv("Other", "1.0.0"), "ignored"));

        let node = graph.node(&foo).unwrap();
        assert_eq!(node.status, NodeStatus::Failed);
        assert!(node.has_warnings());
        assert_eq!(graph.warnings(), vec![(&foo, "registry unavailable")]);
    }

    #[test]
    fn test_find_by_id() {
        let root = pv("Foo", "1.0.0");
        let mut graph = DependencyGraph::new(root.clone());
        graph.discover(&root, "Bar", "2.0.0", pv("Bar", "2.0.0"));

        assert_eq!(graph.find("bar").unwrap().package.version, "2.0.0");
        assert!(graph.find("baz").is_none());
    }

    #[test]
    fn test_detect_cycles() {
        let a = pv("a", "1.0.0");
        let b = pv("b", "1.0.0");
        let c = pv("c", "1.0.0");
        let d = pv("d", "1.0.0");

        let mut graph = DependencyGraph::new(a.clone());
        graph.discover(&a, "b", "1.0.0", b.clone());
        graph.discover(&b, "c", "1.0.0", c.clone());
        graph.discover(&c, "a", "1.0.0", a.clone());
        graph.discover(&a, "d", "1.0.0", d.clone());

        assert!(graph.has_cycles());
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_path(), "a@1.0.0 -> b@1.0.0 -> c@1.0.0 -> a@1.0.0");
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let a = pv("a", "1.0.0");
        let mut graph = DependencyGraph::new(a.clone());
        graph.discover(&a, "a", "1.0.0", a.clone());

        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 1);
    }

    #[test]
    fn test_no_cycles_in_diamond() {
        let a = pv("a", "1.0.0");
        let b = pv("b", "1.0.0");
        let c = pv("c", "1.0.0");
        let d = pv("d", "1.0.0");

        let mut graph = DependencyGraph::new(a.clone());
        graph.discover(&a, "b", "1.0.0", b.clone());
        graph.discover(&a, "c", "1.0.0", c.clone());
        graph.discover(&b, "d", "1.0.0", d.clone());
        graph.discover(&c, "d", "1.0.0", d.clone());

        assert!(!graph.has_cycles());
        assert!(graph.detect_cycles().is_empty());
    }

    #[test]
    fn test_cycle_info_empty() {
        let cycle = CycleInfo { nodes: vec![] };
        assert!(cycle.is_empty());
        assert_eq!(cycle.len(), 0);
        assert_eq!(cycle.cycle_path(), "");
    }

    #[test]
    fn test_mark_incomplete() {
        let mut graph = DependencyGraph::new(pv("Foo", "1.0.0"));
        graph.mark_incomplete();
        assert!(!graph.is_complete());
    }
}
