//! Live NuGet v3 feed client.
//!
//! Uses the registration resource: one `index.json` per package lists every
//! published version together with its dependency groups, so listing
//! versions and reading dependencies share a single cached document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::types::{
    CatalogEntry, DependencySpec, RegistrationIndex, RegistrationPage, ServiceIndex,
};
use super::{RegistryError, RegistryPort, RegistryResult};
use crate::config::Settings;

const REGISTRATIONS_PREFERRED: &str = "RegistrationsBaseUrl/3.6.0";
const REGISTRATIONS_ANY: &str = "RegistrationsBaseUrl";

/// Client for a NuGet v3 feed, e.g. `https://api.nuget.org/v3/index.json`.
pub struct NuGetRegistry {
    client: Client,
    registrations_base: String,
    registrations: Mutex<HashMap<String, Arc<RegistrationSlot>>>,
}

/// Cached registration of one package. Its lock is held while the package is
/// fetched so concurrent callers wait instead of fetching again. Failures are
/// not cached.
type RegistrationSlot = Mutex<Option<Arc<Vec<CatalogEntry>>>>;

impl NuGetRegistry {
    /// Reads the feed's service index and locates its registration resource.
    pub fn connect(service_index_url: &str, settings: &Settings) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(settings.http_timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| RegistryError::Unavailable(format!("HTTP client: {}", e)))?;

        let index: ServiceIndex = get_json(&client, service_index_url)?;
        let registrations_base = registrations_base(&index).ok_or_else(|| {
            RegistryError::Malformed(format!(
                "{} (protocol {}) has no {} resource",
                service_index_url, index.version, REGISTRATIONS_ANY
            ))
        })?;
        info!("Using registrations at {}", registrations_base);

        Ok(Self {
            client,
            registrations_base,
            registrations: Mutex::new(HashMap::new()),
        })
    }

    fn registration(&self, package_id: &str) -> RegistryResult<Arc<Vec<CatalogEntry>>> {
        let key = package_id.to_lowercase();
        let slot = Arc::clone(
            self.registrations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key.clone())
                .or_default(),
        );

        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = cached.as_ref() {
            return Ok(Arc::clone(entries));
        }

        let entries = Arc::new(self.fetch_registration(&key)?);
        debug!("{} has {} published versions", package_id, entries.len());
        *cached = Some(Arc::clone(&entries));
        Ok(entries)
    }

    fn fetch_registration(&self, lower_id: &str) -> RegistryResult<Vec<CatalogEntry>> {
        let url = registration_url(&self.registrations_base, lower_id);
        let index: RegistrationIndex = get_json(&self.client, &url)?;

        let mut entries = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None => {
                    let body: RegistrationPage = get_json(&self.client, &page.id)?;
                    body.items.ok_or_else(|| {
                        RegistryError::Malformed(format!("{} has no items", page.id))
                    })?
                }
            };
            entries.extend(leaves.into_iter().map(|leaf| leaf.catalog_entry));
        }
        Ok(entries)
    }
}

impl RegistryPort for NuGetRegistry {
    fn list_versions(&self, package_id: &str) -> RegistryResult<Vec<String>> {
        Ok(self
            .registration(package_id)?
            .iter()
            .map(|entry| entry.version.clone())
            .collect())
    }

    fn get_dependencies(
        &self,
        package_id: &str,
        version: &str,
    ) -> RegistryResult<Vec<DependencySpec>> {
        self.registration(package_id)?
            .iter()
            .find(|entry| entry.version.eq_ignore_ascii_case(version))
            .map(CatalogEntry::dependencies)
            .ok_or_else(|| RegistryError::NotFound(format!("{} {}", package_id, version)))
    }
}

/// Picks the registration base URL, preferring the gzip/SemVer 2.0 variant.
fn registrations_base(index: &ServiceIndex) -> Option<String> {
    let exact = index
        .resources
        .iter()
        .find(|r| r.resource_type == REGISTRATIONS_PREFERRED);
    let any = || {
        index
            .resources
            .iter()
            .find(|r| r.resource_type.starts_with(REGISTRATIONS_ANY))
    };
    exact.or_else(any).map(|r| r.id.clone())
}

fn registration_url(base: &str, lower_id: &str) -> String {
    format!("{}/{}/index.json", base.trim_end_matches('/'), lower_id)
}

fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> RegistryResult<T> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .map_err(|e| RegistryError::Unavailable(format!("{}: {}", url, e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RegistryError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(RegistryError::Unavailable(format!("{} returned {}", url, status)));
    }

    response.json::<T>().map_err(|e| {
        if e.is_decode() {
            RegistryError::Malformed(format!("{}: {}", url, e))
        } else {
            RegistryError::Unavailable(format!("{}: {}", url, e))
        }
    })
}
