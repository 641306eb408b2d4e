//! nugraph - transitive NuGet dependency graph resolver
//!
//! This crate resolves a package's dependency graph against a NuGet v3 feed
//! (or a local fixture) and renders it as an ASCII tree or a diagram.

pub mod config;
pub mod export;
pub mod graph;
pub mod registry;
pub mod render;
pub mod resolve;
