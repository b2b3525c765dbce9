//! Global false-positive filters and vendor filters

use crate::license::LicenseId;
use crate::{ScoutError, ScoutResult};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

// ─── Global Filters ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Case-insensitive substring
    #[default]
    Substring,
    /// Regular expression
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTarget {
    /// Path of the file inside the archive
    Path,
    /// Canonical license id
    License,
    #[default]
    Any,
}

#[derive(Debug, Clone, Deserialize)]
struct FilterEntry {
    pattern: String,
    #[serde(default)]
    kind: FilterKind,
    #[serde(default)]
    applies_to: FilterTarget,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalFilterFile {
    #[serde(default)]
    filter: Vec<FilterEntry>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Regex(Regex),
}

impl Matcher {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Substring(needle) => value.to_lowercase().contains(needle),
            Self::Regex(re) => re.is_match(value),
        }
    }
}

#[derive(Debug, Clone)]
struct GlobalFilter {
    source: String,
    matcher: Matcher,
    target: FilterTarget,
}

/// Patterns that suppress known false-positive detections in every archive
#[derive(Debug, Clone, Default)]
pub struct GlobalFilters {
    filters: Vec<GlobalFilter>,
}

impl GlobalFilters {
    pub fn from_toml_str(content: &str, origin: &str) -> ScoutResult<Self> {
        let file: GlobalFilterFile = super::parse_toml(content, origin)?;
        let mut filters = Self::default();
        for entry in file.filter {
            filters
                .push(&entry.pattern, entry.kind, entry.applies_to)
                .map_err(|message| ScoutError::config(origin, message))?;
        }
        Ok(filters)
    }

    pub fn load(path: &Path) -> ScoutResult<Self> {
        match super::read_optional(path)? {
            Some(content) => Self::from_toml_str(&content, &path.display().to_string()),
            None => Ok(Self::default()),
        }
    }

    /// Add a filter; fails on an invalid regular expression or empty pattern
    pub fn push(&mut self, pattern: &str, kind: FilterKind, target: FilterTarget) -> Result<(), String> {
        if pattern.trim().is_empty() {
            return Err("empty global filter pattern".to_string());
        }
        let matcher = match kind {
            FilterKind::Substring => Matcher::Substring(pattern.to_lowercase()),
            FilterKind::Regex => Matcher::Regex(
                Regex::new(pattern)
                    .map_err(|e| format!("invalid filter regex '{}': {}", pattern, e))?,
            ),
        };
        self.filters.push(GlobalFilter {
            source: pattern.to_string(),
            matcher,
            target,
        });
        Ok(())
    }

    /// The first filter suppressing a detection of `license` in `path`
    pub fn matching(&self, license: &LicenseId, path: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| match f.target {
                FilterTarget::Path => f.matcher.is_match(path),
                FilterTarget::License => f.matcher.is_match(license.as_str()),
                FilterTarget::Any => {
                    f.matcher.is_match(path) || f.matcher.is_match(license.as_str())
                }
            })
            .map(|f| f.source.as_str())
    }

    pub fn is_filtered(&self, license: &LicenseId, path: &str) -> bool {
        self.matching(license, path).is_some()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ─── Vendor Filter ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct VendorFile {
    #[serde(default)]
    vendors: Vec<String>,
}

/// Vendor names whose archives are flagged and left out of reports
#[derive(Debug, Clone, Default)]
pub struct VendorFilter {
    names: HashSet<String>,
}

impl VendorFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        filter.extend(names);
        filter
    }

    pub fn from_toml_str(content: &str, origin: &str) -> ScoutResult<Self> {
        let file: VendorFile = super::parse_toml(content, origin)?;
        Ok(Self::new(file.vendors))
    }

    pub fn load(path: &Path) -> ScoutResult<Self> {
        match super::read_optional(path)? {
            Some(content) => Self::from_toml_str(&content, &path.display().to_string()),
            None => Ok(Self::default()),
        }
    }

    /// Merge more names (e.g. names given inline next to a vendor file)
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names.extend(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty()),
        );
    }

    pub fn matches(&self, vendor: &str) -> bool {
        self.names.contains(&vendor.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
