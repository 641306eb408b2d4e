//! Version selection against a registry.
//!
//! "latest" means the last version in registry order. Declared NuGet ranges
//! are reduced to a single version without range solving: an inclusive lower
//! bound is taken as an exact version, an exclusive one picks the first version
//! listed after it, and a range without a lower bound falls back to "latest".
//! Upper bounds are ignored.

use std::fmt;

use crate::graph::PackageVersion;
use crate::registry::{RegistryError, RegistryPort, RegistryResult};

/// A request for one version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// The last version the registry lists
    Latest,
    /// One specific version string
    Exact(String),
    /// The first version listed after this one (exclusive lower bound)
    After(String),
}

impl VersionSelector {
    /// Interprets a user- or dependency-supplied selector.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nugraph::resolve::VersionSelector;
    ///
    /// assert_eq!(VersionSelector::parse("latest"), VersionSelector::Latest);
    /// assert_eq!(VersionSelector::parse("1.2.0"), VersionSelector::Exact("1.2.0".into()));
    /// assert_eq!(VersionSelector::parse("[13.0.1, )"), VersionSelector::Exact("13.0.1".into()));
    /// assert_eq!(VersionSelector::parse("(, 2.0]"), VersionSelector::Latest);
    /// ```
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() || selector == "*" || selector.eq_ignore_ascii_case("latest") {
            return Self::Latest;
        }

        if selector.starts_with(['[', '(']) {
            let body = selector
                .trim_start_matches(['[', '('])
                .trim_end_matches([']', ')']);
            let lower = body.split(',').next().unwrap_or_default().trim();
            return if lower.is_empty() {
                Self::Latest
            } else if selector.starts_with('(') {
                Self::After(lower.to_string())
            } else {
                Self::Exact(lower.to_string())
            };
        }

        Self::Exact(selector.to_string())
    }

    /// Resolves this selector for `package_id` against `registry`.
    ///
    /// Fails with [`RegistryError::NotFound`] when the package has no
    /// versions or the exact version is not published; registry failures
    /// propagate unchanged.
    pub fn resolve(
        &self,
        registry: &dyn RegistryPort,
        package_id: &str,
    ) -> RegistryResult<PackageVersion> {
        let versions = registry.list_versions(package_id)?;

        let version = match self {
            Self::Latest => versions.last().ok_or_else(|| {
                RegistryError::NotFound(format!("{} has no published versions", package_id))
            })?,
            Self::Exact(wanted) => versions
                .iter()
                .find(|v| v.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| {
                    RegistryError::NotFound(format!("{} {} is not published", package_id, wanted))
                })?,
            Self::After(bound) => versions
                .iter()
                .skip_while(|v| !v.eq_ignore_ascii_case(bound))
                .nth(1)
                .ok_or_else(|| {
                    RegistryError::NotFound(format!(
                        "{} lists no version after {}",
                        package_id, bound
                    ))
                })?,
        };

        Ok(PackageVersion::new(package_id, version.clone()))
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(version) => write!(f, "{}", version),
            Self::After(bound) => write!(f, ">{}", bound),
        }
    }
}
