//! Breadth-first, depth-bounded construction of a [`DependencyGraph`].

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{CancellationToken, ResolveError, VersionSelector};
use crate::graph::{DependencyGraph, Discovery, NodeStatus, PackageVersion};
use crate::registry::{DependencySpec, RegistryPort, RegistryResult};

type SelectorKey = (String, VersionSelector);

/// Resolves the transitive dependencies of one root package.
///
/// Traversal is level by level. Within a level, dependency lists and the
/// selectors they declare are fetched in parallel; results are then applied
/// to the graph one at a time in frontier order, so every package version is
/// expanded at most once and the output matches a sequential walk.
///
/// # Example
///
/// ```rust
/// use nugraph::registry::FixtureRegistry;
/// use nugraph::resolve::{GraphBuilder, VersionSelector};
///
/// let registry = FixtureRegistry::builder()
///     .version("Foo", "1.0.0", &[("Bar", "latest"), ("Baz", "latest")])
///     .version("Bar", "1.0.0", &[])
///     .version("Baz", "1.0.0", &[("Bar", "1.0.0")])
///     .build();
///
/// let graph = GraphBuilder::new(&registry)
///     .max_depth(10)
///     .build("Foo", &VersionSelector::Latest)
///     .unwrap();
///
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.back_edges().len(), 1);
/// ```
pub struct GraphBuilder<'a> {
    registry: &'a dyn RegistryPort,
    max_depth: usize,
    parallelism: usize,
    cancellation: CancellationToken,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder with a depth bound of 10 and sequential fetching.
    pub fn new(registry: &'a dyn RegistryPort) -> Self {
        Self {
            registry,
            max_depth: 10,
            parallelism: 1,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the deepest level whose nodes may appear in the graph.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets how many registry calls may run at once within a level.
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Sets the token checked at every level boundary.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Resolves `root_id` at `selector` and expands its dependencies.
    ///
    /// Only failures concerning the root are returned as errors. Anything
    /// that goes wrong below the root is recorded as a warning on the
    /// affected node, which stays a leaf.
    pub fn build(
        &self,
        root_id: &str,
        selector: &VersionSelector,
    ) -> Result<DependencyGraph, ResolveError> {
        let root = selector
            .resolve(self.registry, root_id)
            .map_err(|source| ResolveError::Root {
                package: root_id.to_string(),
                selector: selector.to_string(),
                source,
            })?;
        info!("Resolved {} {} to {}", root_id, selector, root.version);

        let pool = self.thread_pool()?;
        let mut graph = DependencyGraph::new(root.clone());
        let mut resolved: HashMap<SelectorKey, RegistryResult<PackageVersion>> = HashMap::new();
        let mut frontier = vec![root];
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= self.max_depth {
                debug!(
                    "Depth limit {} reached; {} packages stay leaves",
                    self.max_depth,
                    frontier.len()
                );
                break;
            }
            if self.cancellation.is_cancelled() {
                warn!(
                    "Resolution cancelled at depth {}; {} packages left unexpanded",
                    depth,
                    frontier.len()
                );
                graph.mark_incomplete();
                break;
            }

            info!("Expanding {} packages at depth {}", frontier.len(), depth);
            let fetched = self.fetch_dependencies(pool.as_ref(), &frontier);
            self.resolve_selectors(pool.as_ref(), &fetched, &mut resolved);

            let mut next = Vec::new();
            for (package, result) in fetched {
                let dependencies = match result {
                    Ok(dependencies) => dependencies,
                    Err(source) if depth == 0 => {
                        return Err(ResolveError::RootDependencies { package, source });
                    }
                    Err(err) => {
                        warn!("Keeping {} as a leaf: {}", package, err);
                        graph.set_status(&package, NodeStatus::Failed);
                        graph.add_warning(&package, err.to_string());
                        continue;
                    }
                };

                graph.set_status(&package, NodeStatus::Expanded);
                for dependency in dependencies {
                    let key = selector_key(&dependency);
                    let outcome = match resolved.get(&key) {
                        Some(outcome) => outcome.clone(),
                        None => key.1.resolve(self.registry, &dependency.id),
                    };
                    if let Some(child) = link(&mut graph, &package, &dependency, outcome) {
                        next.push(child);
                    }
                }
            }

            frontier = next;
            depth += 1;
        }

        info!(
            "Resolved {} packages and {} edges ({} back edges)",
            graph.node_count(),
            graph.edge_count(),
            graph.back_edges().len()
        );
        Ok(graph)
    }

    fn thread_pool(&self) -> Result<Option<ThreadPool>, ResolveError> {
        if self.parallelism <= 1 {
            return Ok(None);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .thread_name(|i| format!("nugraph-fetch-{}", i))
            .build()?;
        Ok(Some(pool))
    }

    fn fetch_dependencies(
        &self,
        pool: Option<&ThreadPool>,
        frontier: &[PackageVersion],
    ) -> Vec<(PackageVersion, RegistryResult<Vec<DependencySpec>>)> {
        let fetch = |package: &PackageVersion| {
            debug!("Fetching dependencies of {}", package);
            let result = self
                .registry
                .get_dependencies(&package.id, &package.version);
            (package.clone(), result)
        };

        match pool {
            Some(pool) => pool.install(|| frontier.par_iter().map(fetch).collect()),
            None => frontier.iter().map(fetch).collect(),
        }
    }

    /// Resolves every selector declared in `fetched` that is not yet in `resolved`.
    fn resolve_selectors(
        &self,
        pool: Option<&ThreadPool>,
        fetched: &[(PackageVersion, RegistryResult<Vec<DependencySpec>>)],
        resolved: &mut HashMap<SelectorKey, RegistryResult<PackageVersion>>,
    ) {
        let mut seen = HashSet::new();
        let pending: Vec<(SelectorKey, &DependencySpec)> = fetched
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .flatten()
            .map(|dependency| (selector_key(dependency), dependency))
            .filter(|(key, _)| !resolved.contains_key(key) && seen.insert(key.clone()))
            .collect();

        let resolve = |(key, dependency): &(SelectorKey, &DependencySpec)| {
            let (_, selector) = key;
            (key.clone(), selector.resolve(self.registry, &dependency.id))
        };

        let results: Vec<_> = match pool {
            Some(pool) => pool.install(|| pending.par_iter().map(resolve).collect()),
            None => pending.iter().map(resolve).collect(),
        };
        resolved.extend(results);
    }
}

fn selector_key(dependency: &DependencySpec) -> SelectorKey {
    (
        dependency.id.to_lowercase(),
        VersionSelector::parse(&dependency.version),
    )
}

/// Adds the edge `package -> dependency` and returns the child if it needs expanding.
fn link(
    graph: &mut DependencyGraph,
    package: &PackageVersion,
    dependency: &DependencySpec,
    outcome: RegistryResult<PackageVersion>,
) -> Option<PackageVersion> {
    match outcome {
        Ok(child) => {
            let discovery =
                graph.discover(package, &dependency.id, &dependency.version, child.clone())?;
            let expand = discovery == Discovery::New || graph.promote_unresolved(&child);
            expand.then_some(child)
        }
        Err(err) => {
            // keep the declared selector as the version of the unresolved leaf
            let child = PackageVersion::new(&dependency.id, &dependency.version);
            let discovery =
                graph.discover(package, &dependency.id, &dependency.version, child.clone())?;
            if discovery == Discovery::New {
                warn!("Cannot resolve {} required by {}: {}", child, package, err);
                graph.set_status(&child, NodeStatus::Unresolved);
                graph.add_warning(&child, err.to_string());
            }
            None
        }
    }
}
