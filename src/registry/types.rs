//! Shared registry data shapes.
//!
//! [`DependencySpec`] is the normalized dependency declaration handed to the
//! resolver. The remaining types mirror the JSON documents read by the
//! registry implementations.

use serde::{Deserialize, Serialize};

/// A dependency as declared by a package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// The dependency package id (e.g., "Newtonsoft.Json").
    pub id: String,

    /// The version selector as declared (e.g., "13.0.1", "[13.0.1, )", "latest").
    #[serde(default = "latest")]
    pub version: String,
}

impl DependencySpec {
    /// Creates a new dependency declaration.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

fn latest() -> String {
    "latest".to_string()
}

/// Root of a registry fixture file.
///
/// ```json
/// { "packages": [
///     { "id": "Foo", "versions": [
///         { "version": "1.0.0", "dependencies": [ { "id": "Bar", "version": "latest" } ] }
///     ] }
/// ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureDocument {
    /// All packages known to the fixture.
    #[serde(default)]
    pub packages: Vec<FixturePackage>,
}

/// One package in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePackage {
    /// Package id.
    pub id: String,

    /// Published versions in ascending publish order.
    #[serde(default)]
    pub versions: Vec<FixtureVersion>,
}

/// One published version in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureVersion {
    /// Version string.
    pub version: String,

    /// Direct dependencies of this version.
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// Simulates a registry outage when this version's dependencies are requested.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

/// NuGet v3 service index (`index.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceIndex {
    /// Advertised protocol version, e.g. "3.0.0".
    pub version: String,

    /// Resources offered by the feed.
    #[serde(default)]
    pub resources: Vec<ServiceResource>,
}

/// A resource entry in the NuGet service index.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceResource {
    /// Resource URL.
    #[serde(rename = "@id")]
    pub id: String,

    /// Resource type, e.g. "RegistrationsBaseUrl/3.6.0".
    #[serde(rename = "@type")]
    pub resource_type: String,
}

/// NuGet registration index for one package.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationIndex {
    /// Pages of registration leaves, in ascending version order.
    #[serde(default)]
    pub items: Vec<RegistrationPage>,
}

/// A page of a registration index. Large packages leave `items` out and
/// must be fetched from `@id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationPage {
    /// Page URL.
    #[serde(rename = "@id")]
    pub id: String,

    /// Inlined leaves, if present.
    pub items: Option<Vec<RegistrationLeaf>>,
}

/// A single registration leaf (one package version).
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationLeaf {
    /// Version metadata.
    #[serde(rename = "catalogEntry")]
    pub catalog_entry: CatalogEntry,
}

/// Catalog metadata for one package version.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Package id in its canonical casing.
    pub id: String,

    /// Version string.
    pub version: String,

    /// Dependencies grouped by target framework.
    #[serde(rename = "dependencyGroups", default)]
    pub dependency_groups: Vec<DependencyGroup>,
}

/// Dependencies declared for one target framework.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyGroup {
    /// Target framework moniker, absent for framework-agnostic groups.
    #[serde(rename = "targetFramework")]
    pub target_framework: Option<String>,

    /// Dependencies in this group.
    #[serde(default)]
    pub dependencies: Vec<GroupDependency>,
}

/// A dependency inside a NuGet dependency group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDependency {
    /// Dependency package id.
    pub id: String,

    /// Version range, e.g. "[13.0.1, )". Absent means any version.
    pub range: Option<String>,
}

impl CatalogEntry {
    /// Flattens all dependency groups into one list.
    ///
    /// A dependency declared for several frameworks appears once, with the
    /// range of its first declaration.
    pub fn dependencies(&self) -> Vec<DependencySpec> {
        let mut deps: Vec<DependencySpec> = Vec::new();
        for dep in self
            .dependency_groups
            .iter()
            .flat_map(|group| group.dependencies.iter())
        {
            if deps.iter().any(|d| d.id.eq_ignore_ascii_case(&dep.id)) {
                continue;
            }
            let version = dep.range.clone().unwrap_or_else(latest);
            deps.push(DependencySpec::new(dep.id.clone(), version));
        }
        deps
    }
}
