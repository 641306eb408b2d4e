//! Dependency resolution.
//!
//! [`VersionSelector`] turns a requested version into a concrete one,
//! [`GraphBuilder`] expands a root package into a [`DependencyGraph`], and
//! [`resolve_graph`] runs the whole pipeline for one [`RunConfig`].

mod builder;
mod selector;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use builder::GraphBuilder;
pub use selector::VersionSelector;

use crate::config::{RunConfig, Settings};
use crate::graph::{self, DependencyGraph, PackageVersion};
use crate::registry::{RegistryError, RegistryPort};

/// Fatal resolution failures. Only problems with the root package end a run.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The root package or its requested version could not be resolved.
    #[error("cannot resolve {package} {selector}: {source}")]
    Root {
        package: String,
        selector: String,
        #[source]
        source: RegistryError,
    },

    /// The root's dependency list could not be fetched.
    #[error("cannot read dependencies of {package}: {source}")]
    RootDependencies {
        package: PackageVersion,
        #[source]
        source: RegistryError,
    },

    /// The fetch thread pool could not be started.
    #[error("cannot start fetch workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Shared flag asking a running build to stop at the next level boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builds the graph for `config` and applies its package filter.
///
/// # Example
///
/// ```rust
/// use nugraph::config::{RunConfig, Settings};
/// use nugraph::registry::FixtureRegistry;
/// use nugraph::resolve::{resolve_graph, CancellationToken};
///
/// let registry = FixtureRegistry::builder()
///     .version("App", "1.0.0", &[("Serilog", "latest"), ("Polly", "latest")])
///     .version("Serilog", "3.1.1", &[])
///     .version("Polly", "8.2.0", &[])
///     .build();
/// let config = RunConfig {
///     package: "App".into(),
///     repository: "fixture.json".into(),
///     filter: "seri".into(),
///     ..RunConfig::default()
/// };
///
/// let graph = resolve_graph(&registry, &config, &Settings::default(), CancellationToken::new())
///     .unwrap();
/// assert_eq!(graph.node_count(), 2);
/// ```
pub fn resolve_graph(
    registry: &dyn RegistryPort,
    config: &RunConfig,
    settings: &Settings,
    cancellation: CancellationToken,
) -> Result<DependencyGraph, ResolveError> {
    let graph = GraphBuilder::new(registry)
        .max_depth(config.depth_limit())
        .parallelism(settings.parallelism)
        .cancellation(cancellation)
        .build(&config.package, &VersionSelector::parse(&config.version))?;

    Ok(graph::filter(&graph, &config.filter))
}
