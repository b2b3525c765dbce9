//! Reference catalogs
//!
//! Immutable tables loaded once before any archive is processed: known
//! licenses with their legal status and detection signatures, providers,
//! notices, license texts, name/URL mappings, global filters and vendor
//! filters. Every loading problem is a fatal configuration error.

pub mod filters;
pub mod mappings;
pub mod overrides;

pub use filters::{FilterKind, FilterTarget, GlobalFilters, VendorFilter};
pub use mappings::{NameMappings, UrlMappings};

use crate::license::{LegalStatus, License, LicenseId};
use crate::{ScoutError, ScoutResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

// ─── Descriptive entities ──────────────────────────────────────────

/// Organisation that provides archives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Notice text to be reproduced for an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub text: String,
}

// ─── File schemas ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LicenseFile {
    #[serde(default)]
    legal_statuses: Vec<LegalStatus>,
    #[serde(default)]
    license: Vec<License>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderFile {
    #[serde(default)]
    provider: Vec<Provider>,
}

#[derive(Debug, Default, Deserialize)]
struct NoticeFile {
    #[serde(default)]
    notice: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
struct LicenseTextEntry {
    license: LicenseId,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct LicenseTextFile {
    #[serde(default)]
    text: Vec<LicenseTextEntry>,
}

// ─── Configuration paths ───────────────────────────────────────────

/// Locations of all configuration files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPaths {
    pub licenses: PathBuf,
    pub providers: PathBuf,
    pub notices: PathBuf,
    pub license_texts: PathBuf,
    pub name_mappings: PathBuf,
    pub url_mappings: PathBuf,
    pub global_filters: PathBuf,
    pub filtered_vendors: PathBuf,
    pub checked_archives: PathBuf,
    /// Vendor names given inline; merged with `filtered_vendors`
    #[serde(default)]
    pub filtered_vendor_names: Vec<String>,
}

impl ConfigPaths {
    /// Default file names inside a configuration directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            licenses: dir.join("licenses.toml"),
            providers: dir.join("providers.toml"),
            notices: dir.join("notices.toml"),
            license_texts: dir.join("license_texts.toml"),
            name_mappings: dir.join("name_mappings.toml"),
            url_mappings: dir.join("url_mappings.toml"),
            global_filters: dir.join("global_filters.toml"),
            filtered_vendors: dir.join("filtered_vendors.toml"),
            checked_archives: dir.join("checked_archives.toml"),
            filtered_vendor_names: Vec::new(),
        }
    }
}

// ─── Catalogs ──────────────────────────────────────────────────────

/// All read-only reference tables for one run
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    licenses: Vec<License>,
    by_id: HashMap<String, usize>,
    by_spdx: HashMap<String, usize>,
    by_url: HashMap<String, usize>,
    legal_statuses: BTreeSet<LegalStatus>,
    providers: HashMap<String, Provider>,
    notices: HashMap<String, Notice>,
    license_texts: HashMap<String, String>,
    name_mappings: NameMappings,
    url_mappings: UrlMappings,
    global_filters: GlobalFilters,
    vendor_filter: VendorFilter,
}

impl Catalogs {
    /// Build the license catalog. Every license's legal status must be one
    /// of `legal_statuses` (or a built-in status) and ids must be unique.
    pub fn new(licenses: Vec<License>, legal_statuses: Vec<LegalStatus>) -> ScoutResult<Self> {
        Self::build(licenses, legal_statuses, "license catalog")
    }

    fn build(
        licenses: Vec<License>,
        legal_statuses: Vec<LegalStatus>,
        origin: &str,
    ) -> ScoutResult<Self> {
        let legal_statuses: BTreeSet<LegalStatus> = legal_statuses.into_iter().collect();
        let mut by_id = HashMap::new();
        let mut by_spdx = HashMap::new();
        let mut by_url = HashMap::new();

        for (idx, license) in licenses.iter().enumerate() {
            if license.id.as_str().trim().is_empty() {
                return Err(ScoutError::config(origin, "license with empty id"));
            }
            if by_id.insert(license.id.key(), idx).is_some() {
                return Err(ScoutError::config(
                    origin,
                    format!("duplicate license id '{}'", license.id),
                ));
            }
            if !license.legal_status.is_builtin() && !legal_statuses.contains(&license.legal_status) {
                return Err(ScoutError::config(
                    origin,
                    format!(
                        "license '{}' has undeclared legal status '{}'",
                        license.id, license.legal_status
                    ),
                ));
            }
            if let Some(spdx) = &license.spdx_identifier {
                by_spdx.entry(spdx.trim().to_lowercase()).or_insert(idx);
            }
            if let Some(url) = &license.url {
                by_url.entry(mappings::normalize_url(url)).or_insert(idx);
            }
        }

        Ok(Self {
            licenses,
            by_id,
            by_spdx,
            by_url,
            legal_statuses,
            ..Default::default()
        })
    }

    pub fn from_toml_str(content: &str, origin: &str) -> ScoutResult<Self> {
        let file: LicenseFile = parse_toml(content, origin)?;
        Self::build(file.license, file.legal_statuses, origin)
    }

    /// Load every catalog named by `paths`. The license file is required;
    /// the other tables are empty when their file is absent.
    pub fn load(paths: &ConfigPaths) -> ScoutResult<Self> {
        let origin = paths.licenses.display().to_string();
        let content = std::fs::read_to_string(&paths.licenses)
            .map_err(|e| ScoutError::config(&origin, format!("failed to read: {}", e)))?;
        let mut vendor_filter = VendorFilter::load(&paths.filtered_vendors)?;
        vendor_filter.extend(&paths.filtered_vendor_names);

        let catalogs = Self::from_toml_str(&content, &origin)?
            .with_providers(load_providers(&paths.providers)?)
            .with_notices(load_notices(&paths.notices)?)
            .with_license_texts(load_license_texts(&paths.license_texts)?)
            .with_name_mappings(NameMappings::load(&paths.name_mappings)?)
            .with_url_mappings(UrlMappings::load(&paths.url_mappings)?)
            .with_global_filters(GlobalFilters::load(&paths.global_filters)?)
            .with_vendor_filter(vendor_filter);
        catalogs.validate()?;

        tracing::info!(
            "Catalogs loaded: {} licenses, {} providers, {} notices, {} name / {} URL mappings, {} global filters, {} filtered vendors",
            catalogs.licenses.len(),
            catalogs.providers.len(),
            catalogs.notices.len(),
            catalogs.name_mappings.len(),
            catalogs.url_mappings.len(),
            catalogs.global_filters.len(),
            catalogs.vendor_filter.len()
        );
        Ok(catalogs)
    }

    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.providers = providers.into_iter().map(|p| (p.id.clone(), p)).collect();
        self
    }

    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices.into_iter().map(|n| (n.id.clone(), n)).collect();
        self
    }

    pub fn with_license_texts(mut self, texts: Vec<(LicenseId, String)>) -> Self {
        self.license_texts = texts.into_iter().map(|(id, t)| (id.key(), t)).collect();
        self
    }

    pub fn with_name_mappings(mut self, mappings: NameMappings) -> Self {
        self.name_mappings = mappings;
        self
    }

    pub fn with_url_mappings(mut self, mappings: UrlMappings) -> Self {
        self.url_mappings = mappings;
        self
    }

    pub fn with_global_filters(mut self, filters: GlobalFilters) -> Self {
        self.global_filters = filters;
        self
    }

    pub fn with_vendor_filter(mut self, filter: VendorFilter) -> Self {
        self.vendor_filter = filter;
        self
    }

    /// Check cross-table references: mapping targets and license texts
    /// must name catalog licenses.
    pub fn validate(&self) -> ScoutResult<()> {
        for target in self.name_mappings.targets() {
            if self.license(target).is_none() {
                return Err(ScoutError::config(
                    "name mappings",
                    format!("mapping target '{}' is not a known license", target),
                ));
            }
        }
        for target in self.url_mappings.targets() {
            if self.license(target).is_none() {
                return Err(ScoutError::config(
                    "URL mappings",
                    format!("mapping target '{}' is not a known license", target),
                ));
            }
        }
        for id in self.license_texts.keys() {
            if !self.by_id.contains_key(id) {
                return Err(ScoutError::config(
                    "license texts",
                    format!("text for unknown license '{}'", id),
                ));
            }
        }
        Ok(())
    }

    // ── Lookups ──

    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    /// Look up a license by catalog id (case-insensitive)
    pub fn license(&self, id: &LicenseId) -> Option<&License> {
        self.by_id.get(&id.key()).map(|&i| &self.licenses[i])
    }

    /// Look up a license by SPDX identifier (case-insensitive)
    pub fn license_by_spdx(&self, spdx: &str) -> Option<&License> {
        self.by_spdx
            .get(&spdx.trim().to_lowercase())
            .map(|&i| &self.licenses[i])
    }

    /// Resolve a declared license name to catalog ids: name mapping first,
    /// then catalog id, then SPDX identifier.
    pub fn resolve_name(&self, name: &str) -> Vec<LicenseId> {
        if let Some(ids) = self.name_mappings.lookup(name) {
            return self.canonical(ids);
        }
        self.license(&LicenseId::new(name.trim()))
            .or_else(|| self.license_by_spdx(name))
            .map(|l| vec![l.id.clone()])
            .unwrap_or_default()
    }

    /// Resolve a license URL to catalog ids: URL mapping first, then the
    /// URL declared on a catalog license.
    pub fn resolve_url(&self, url: &str) -> Vec<LicenseId> {
        if let Some(ids) = self.url_mappings.lookup(url) {
            return self.canonical(ids);
        }
        self.by_url
            .get(&mappings::normalize_url(url))
            .map(|&i| vec![self.licenses[i].id.clone()])
            .unwrap_or_default()
    }

    /// Resolve either a name or a URL
    pub fn resolve(&self, name_or_url: &str) -> Vec<LicenseId> {
        if mappings::looks_like_url(name_or_url) {
            self.resolve_url(name_or_url)
        } else {
            self.resolve_name(name_or_url)
        }
    }

    fn canonical(&self, ids: &[LicenseId]) -> Vec<LicenseId> {
        ids.iter()
            .filter_map(|id| self.license(id).map(|l| l.id.clone()))
            .collect()
    }

    /// Configured legal status of a license; `unknown` when not in the catalog
    pub fn legal_status_of(&self, id: &LicenseId) -> LegalStatus {
        self.license(id)
            .map(|l| l.legal_status.clone())
            .unwrap_or_else(LegalStatus::unknown)
    }

    /// Whether `status` is declared by the catalog or built in
    pub fn is_known_status(&self, status: &LegalStatus) -> bool {
        status.is_builtin() || self.legal_statuses.contains(status)
    }

    pub fn legal_statuses(&self) -> impl Iterator<Item = &LegalStatus> {
        self.legal_statuses.iter()
    }

    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn notice(&self, id: &str) -> Option<&Notice> {
        self.notices.get(id)
    }

    pub fn license_text(&self, id: &LicenseId) -> Option<&str> {
        self.license_texts.get(&id.key()).map(String::as_str)
    }

    pub fn name_mappings(&self) -> &NameMappings {
        &self.name_mappings
    }

    pub fn url_mappings(&self) -> &UrlMappings {
        &self.url_mappings
    }

    pub fn global_filters(&self) -> &GlobalFilters {
        &self.global_filters
    }

    pub fn vendor_filter(&self) -> &VendorFilter {
        &self.vendor_filter
    }
}

// ─── Loading helpers ───────────────────────────────────────────────

pub(crate) fn parse_toml<T: DeserializeOwned>(content: &str, origin: &str) -> ScoutResult<T> {
    toml::from_str(content).map_err(|e| ScoutError::config(origin, e.to_string()))
}

/// Read an optional configuration file; absence is not an error
pub(crate) fn read_optional(path: &Path) -> ScoutResult<Option<String>> {
    if !path.exists() {
        tracing::debug!("Optional configuration file {} not found", path.display());
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| ScoutError::config(path.display().to_string(), format!("failed to read: {}", e)))
}

fn load_providers(path: &Path) -> ScoutResult<Vec<Provider>> {
    let origin = path.display().to_string();
    Ok(match read_optional(path)? {
        Some(content) => parse_toml::<ProviderFile>(&content, &origin)?.provider,
        None => Vec::new(),
    })
}

fn load_notices(path: &Path) -> ScoutResult<Vec<Notice>> {
    let origin = path.display().to_string();
    Ok(match read_optional(path)? {
        Some(content) => parse_toml::<NoticeFile>(&content, &origin)?.notice,
        None => Vec::new(),
    })
}

fn load_license_texts(path: &Path) -> ScoutResult<Vec<(LicenseId, String)>> {
    let origin = path.display().to_string();
    Ok(match read_optional(path)? {
        Some(content) => parse_toml::<LicenseTextFile>(&content, &origin)?
            .text
            .into_iter()
            .map(|t| (t.license, t.text))
            .collect(),
        None => Vec::new(),
    })
}
