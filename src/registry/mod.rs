//! Package registry access.
//!
//! The resolver talks to registries only through [`RegistryPort`]. Two
//! implementations exist:
//!
//! - [`NuGetRegistry`] - a live NuGet v3 feed reached over HTTP
//! - [`FixtureRegistry`] - an in-memory registry loaded from a JSON file
//!   or built in code, used by `--test-mode` and by tests
//!
//! Whatever goes wrong behind the port is reported as a [`RegistryError`].

mod fixture;
mod nuget;
pub mod types;

pub use fixture::{FixtureRegistry, FixtureRegistryBuilder};
pub use nuget::NuGetRegistry;
pub use types::DependencySpec;

#[cfg(test)]
pub(crate) use fixture::CountingRegistry;

/// Errors that can cross the registry boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Transport or service failure; may succeed on a later attempt.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The requested package or version does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registry answered with something that could not be understood.
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

impl RegistryError {
    /// Returns true for [`RegistryError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Capability to query a package registry.
///
/// Implementations must be shareable across threads: the resolver fetches
/// the dependency lists of one traversal level in parallel.
pub trait RegistryPort: Send + Sync {
    /// Lists the published versions of a package in ascending publish order.
    fn list_versions(&self, package_id: &str) -> RegistryResult<Vec<String>>;

    /// Lists the direct dependencies declared by one version of a package.
    fn get_dependencies(&self, package_id: &str, version: &str)
        -> RegistryResult<Vec<DependencySpec>>;
}
