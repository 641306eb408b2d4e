//! Renderers for a resolved [`DependencyGraph`](crate::graph::DependencyGraph).
//!
//! Both renderers are pure functions of the graph:
//!
//! - [`render_ascii_tree`] - indented text tree for the terminal
//! - [`render_diagram`] - node/edge lists for image generation

mod ascii;
mod diagram;

pub use ascii::{render_ascii_tree, ALREADY_SHOWN, INCOMPLETE};
pub use diagram::{render_diagram, Diagram, DiagramEdge, DiagramNode};
