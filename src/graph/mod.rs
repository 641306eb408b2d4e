//! Graph module for resolved dependency relationships.
//!
//! This module provides the [`DependencyGraph`] built by the resolver and
//! consumed by the renderers, plus [`filter`] for narrowing it by package id.
//!
//! # Example
//!
//! ```rust
//! use nugraph::graph::{DependencyGraph, PackageVersion};
//!
//! let foo = PackageVersion::new("Foo", "1.0.0");
//! let mut graph = DependencyGraph::new(foo.clone());
//! graph.discover(&foo, "Bar", "latest", PackageVersion::new("Bar", "2.0.0"));
//!
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! ```

mod dependency_graph;
mod filter;

pub use dependency_graph::{
    CycleInfo, DependencyEdge, DependencyGraph, Discovery, NodeStatus, PackageNode,
    PackageVersion,
};
pub use filter::filter;
