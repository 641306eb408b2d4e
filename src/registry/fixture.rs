//! In-memory registry backed by a JSON fixture.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;

use super::types::{DependencySpec, FixtureDocument, FixturePackage, FixtureVersion};
use super::{RegistryError, RegistryPort, RegistryResult};

/// A registry whose contents are fully known up front.
///
/// Package ids are matched case-insensitively. Versions keep the order in
/// which they were listed, which defines what "latest" means.
///
/// # Example
///
/// ```rust
/// use nugraph::registry::{FixtureRegistry, RegistryPort};
///
/// let registry = FixtureRegistry::builder()
///     .version("Foo", "1.0.0", &[("Bar", "latest")])
///     .version("Bar", "2.0.0", &[])
///     .build();
///
/// assert_eq!(registry.list_versions("foo").unwrap(), vec!["1.0.0"]);
/// assert_eq!(registry.get_dependencies("Foo", "1.0.0").unwrap()[0].id, "Bar");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    packages: HashMap<String, FixturePackage>,
}

impl FixtureRegistry {
    /// Starts building a registry in code.
    pub fn builder() -> FixtureRegistryBuilder {
        FixtureRegistryBuilder::default()
    }

    /// Loads a fixture file.
    ///
    /// A missing or unreadable file is reported as unavailable, invalid
    /// JSON as malformed.
    pub fn from_file(path: &Path) -> RegistryResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RegistryError::Unavailable(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json(&content)?;
        debug!(
            "Loaded fixture {} with {} packages",
            path.display(),
            registry.packages.len()
        );
        Ok(registry)
    }

    /// Parses a fixture document from a string.
    pub fn from_json(content: &str) -> RegistryResult<Self> {
        let document: FixtureDocument = serde_json::from_str(content)
            .map_err(|e| RegistryError::Malformed(format!("fixture: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Indexes a parsed fixture document.
    ///
    /// Later entries for an already listed package append their versions.
    pub fn from_document(document: FixtureDocument) -> Self {
        let mut packages: HashMap<String, FixturePackage> = HashMap::new();
        for package in document.packages {
            match packages.get_mut(&package.id.to_lowercase()) {
                Some(existing) => existing.versions.extend(package.versions),
                None => {
                    packages.insert(package.id.to_lowercase(), package);
                }
            }
        }
        Self { packages }
    }

    fn package(&self, package_id: &str) -> RegistryResult<&FixturePackage> {
        self.packages
            .get(&package_id.to_lowercase())
            .ok_or_else(|| RegistryError::NotFound(format!("package {}", package_id)))
    }

    fn version(&self, package_id: &str, version: &str) -> RegistryResult<&FixtureVersion> {
        self.package(package_id)?
            .versions
            .iter()
            .find(|v| v.version == version)
            .ok_or_else(|| RegistryError::NotFound(format!("{} {}", package_id, version)))
    }
}

impl RegistryPort for FixtureRegistry {
    fn list_versions(&self, package_id: &str) -> RegistryResult<Vec<String>> {
        Ok(self
            .package(package_id)?
            .versions
            .iter()
            .map(|v| v.version.clone())
            .collect())
    }

    fn get_dependencies(
        &self,
        package_id: &str,
        version: &str,
    ) -> RegistryResult<Vec<DependencySpec>> {
        let entry = self.version(package_id, version)?;
        if entry.unavailable {
            return Err(RegistryError::Unavailable(format!(
                "dependencies of {} {} could not be fetched",
                package_id, version
            )));
        }
        Ok(entry.dependencies.clone())
    }
}

/// Builds a [`FixtureRegistry`] in code.
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistryBuilder {
    document: FixtureDocument,
}

impl FixtureRegistryBuilder {
    /// Publishes `version` of `id` with the given `(dependency id, selector)` pairs.
    ///
    /// Versions of one package must be added in ascending publish order.
    pub fn version(mut self, id: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        let entry = FixtureVersion {
            version: version.to_string(),
            dependencies: dependencies
                .iter()
                .map(|(dep_id, selector)| DependencySpec::new(*dep_id, *selector))
                .collect(),
            unavailable: false,
        };
        self.push(id, entry);
        self
    }

    /// Publishes `version` of `id` whose dependency list cannot be fetched.
    pub fn unavailable(mut self, id: &str, version: &str) -> Self {
        let entry = FixtureVersion {
            version: version.to_string(),
            dependencies: Vec::new(),
            unavailable: true,
        };
        self.push(id, entry);
        self
    }

    fn push(&mut self, id: &str, entry: FixtureVersion) {
        let packages = &mut self.document.packages;
        match packages.iter_mut().find(|p| p.id.eq_ignore_ascii_case(id)) {
            Some(package) => package.versions.push(entry),
            None => packages.push(FixturePackage {
                id: id.to_string(),
                versions: vec![entry],
            }),
        }
    }

    /// Finishes the registry.
    pub fn build(self) -> FixtureRegistry {
        FixtureRegistry::from_document(self.document)
    }
}

/// Wraps a registry and counts calls per package, for asserting fetch bounds.
#[cfg(test)]
pub(crate) struct CountingRegistry<R> {
    inner: R,
    dependency_calls: std::sync::Mutex<HashMap<String, usize>>,
}

#[cfg(test)]
impl<R: RegistryPort> CountingRegistry<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            dependency_calls: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Number of `get_dependencies` calls made for `package_id`.
    pub(crate) fn dependency_calls(&self, package_id: &str) -> usize {
        let calls = self.dependency_calls.lock().unwrap();
        calls.get(&package_id.to_lowercase()).copied().unwrap_or(0)
    }

    pub(crate) fn total_dependency_calls(&self) -> usize {
        self.dependency_calls.lock().unwrap().values().sum()
    }
}

#[cfg(test)]
impl<R: RegistryPort> RegistryPort for CountingRegistry<R> {
    fn list_versions(&self, package_id: &str) -> RegistryResult<Vec<String>> {
        self.inner.list_versions(package_id)
    }

    fn get_dependencies(
        &self,
        package_id: &str,
        version: &str,
    ) -> RegistryResult<Vec<DependencySpec>> {
        *self
            .dependency_calls
            .lock()
            .unwrap()
            .entry(package_id.to_lowercase())
            .or_default() += 1;
        self.inner.get_dependencies(package_id, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_versions_keep_listed_order() {
        let registry = FixtureRegistry::builder()
            .version("Foo", "1.0.0", &[])
            .version("Foo", "1.2.0", &[])
            .version("foo", "2.0.0", &[])
            .build();

        assert_eq!(
            registry.list_versions("FOO").unwrap(),
            vec!["1.0.0", "1.2.0", "2.0.0"]
        );
    }

    #[test]
    fn test_unknown_package_and_version() {
        let registry = FixtureRegistry::builder().version("Foo", "1.0.0", &[]).build();

        assert!(registry.list_versions("Bar").unwrap_err().is_not_found());
        assert!(registry
            .get_dependencies("Foo", "9.9.9")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_unavailable_version() {
        let registry = FixtureRegistry::builder().unavailable("Baz", "1.0.0").build();

        assert_eq!(registry.list_versions("Baz").unwrap(), vec!["1.0.0"]);
        assert!(matches!(
            registry.get_dependencies("Baz", "1.0.0"),
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"packages": [
                {{"id": "Foo", "versions": [
                    {{"version": "1.0.0", "dependencies": [{{"id": "Bar", "version": "[1.0.0, )"}}]}}
                ]}}
            ]}}"#
        )
        .unwrap();

        let registry = FixtureRegistry::from_file(file.path()).unwrap();
        let deps = registry.get_dependencies("foo", "1.0.0").unwrap();
        assert_eq!(deps, vec![DependencySpec::new("Bar", "[1.0.0, )")]);
    }

    #[test]
    fn test_from_file_errors() {
        let missing = FixtureRegistry::from_file(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(RegistryError::Unavailable(_))));

        let garbage = FixtureRegistry::from_json("{ not json");
        assert!(matches!(garbage, Err(RegistryError::Malformed(_))));
    }

    #[test]
    fn test_counting_registry() {
        let registry = CountingRegistry::new(
            FixtureRegistry::builder().version("Foo", "1.0.0", &[]).build(),
        );
        registry.get_dependencies("Foo", "1.0.0").unwrap();
        registry.get_dependencies("foo", "1.0.0").unwrap();

        assert_eq!(registry.dependency_calls("FOO"), 2);
        assert_eq!(registry.total_dependency_calls(), 2);
    }
}
