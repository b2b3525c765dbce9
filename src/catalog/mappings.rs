//! License name and URL mapping tables
//!
//! Collapse textual variants of a license ("Apache License, Version 2.0",
//! "http://www.apache.org/licenses/LICENSE-2.0.txt") onto catalog ids.
//! A single alias may map to several licenses (e.g. "Dual MIT/GPL").

use crate::license::LicenseId;
use crate::ScoutResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_ids(self) -> Vec<LicenseId> {
        match self {
            Self::One(id) => vec![LicenseId::new(id)],
            Self::Many(ids) => ids.into_iter().map(LicenseId::new).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: HashMap<String, OneOrMany>,
}

fn parse_mappings(
    content: &str,
    origin: &str,
    normalize: fn(&str) -> String,
) -> ScoutResult<HashMap<String, Vec<LicenseId>>> {
    let file: MappingFile = super::parse_toml(content, origin)?;
    let mut map = HashMap::new();
    for (alias, target) in file.mappings {
        let ids = target.into_ids();
        if ids.is_empty() {
            return Err(crate::ScoutError::config(
                origin,
                format!("mapping '{}' has no target license", alias),
            ));
        }
        map.insert(normalize(&alias), ids);
    }
    Ok(map)
}

// ─── Names ─────────────────────────────────────────────────────────

/// Alias → canonical license ids, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct NameMappings {
    map: HashMap<String, Vec<LicenseId>>,
}

impl NameMappings {
    pub fn from_toml_str(content: &str, origin: &str) -> ScoutResult<Self> {
        Ok(Self {
            map: parse_mappings(content, origin, normalize_name)?,
        })
    }

    pub fn load(path: &Path) -> ScoutResult<Self> {
        match super::read_optional(path)? {
            Some(content) => Self::from_toml_str(&content, &path.display().to_string()),
            None => Ok(Self::default()),
        }
    }

    pub fn insert(&mut self, alias: &str, ids: &[&str]) {
        self.map
            .insert(normalize_name(alias), ids.iter().map(|i| LicenseId::new(*i)).collect());
    }

    pub fn lookup(&self, name: &str) -> Option<&[LicenseId]> {
        self.map.get(&normalize_name(name)).map(Vec::as_slice)
    }

    pub fn targets(&self) -> impl Iterator<Item = &LicenseId> {
        self.map.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ─── URLs ──────────────────────────────────────────────────────────

/// License URL → canonical license ids; scheme, `www.` and trailing
/// slashes are ignored when matching
#[derive(Debug, Clone, Default)]
pub struct UrlMappings {
    map: HashMap<String, Vec<LicenseId>>,
}

impl UrlMappings {
    pub fn from_toml_str(content: &str, origin: &str) -> ScoutResult<Self> {
        Ok(Self {
            map: parse_mappings(content, origin, normalize_url)?,
        })
    }

    pub fn load(path: &Path) -> ScoutResult<Self> {
        match super::read_optional(path)? {
            Some(content) => Self::from_toml_str(&content, &path.display().to_string()),
            None => Ok(Self::default()),
        }
    }

    pub fn insert(&mut self, url: &str, ids: &[&str]) {
        self.map
            .insert(normalize_url(url), ids.iter().map(|i| LicenseId::new(*i)).collect());
    }

    pub fn lookup(&self, url: &str) -> Option<&[LicenseId]> {
        self.map.get(&normalize_url(url)).map(Vec::as_slice)
    }

    pub fn targets(&self) -> impl Iterator<Item = &LicenseId> {
        self.map.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

/// Whether a declared license value looks like a URL rather than a name
pub fn looks_like_url(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_mapping_parse_and_lookup() {
        let toml_str = r#"
            [mappings]
            "Apache License, Version 2.0" = "Apache-2.0"
            "The  MIT   License" = "MIT"
            "Dual MIT/GPL" = ["MIT", "GPL-2.0-only"]
        "#;
        let names = NameMappings::from_toml_str(toml_str, "name_mappings.toml").unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(
            names.lookup("apache license, version 2.0"),
            Some(&[LicenseId::new("Apache-2.0")][..])
        );
        assert_eq!(names.lookup("the mit license").map(|ids| ids.len()), Some(1));
        assert_eq!(names.lookup("Dual MIT/GPL").map(|ids| ids.len()), Some(2));
        assert!(names.lookup("BSD").is_none());
    }

    #[test]
    fn test_url_normalization() {
        assert_eq!(
            normalize_url("HTTPS://www.apache.org/licenses/LICENSE-2.0/"),
            "apache.org/licenses/license-2.0"
        );
        let mut urls = UrlMappings::default();
        urls.insert("http://opensource.org/licenses/MIT", &["MIT"]);
        assert!(urls.lookup("https://opensource.org/licenses/mit/").is_some());
        assert!(looks_like_url("https://example.org"));
        assert!(!looks_like_url("MIT"));
    }

    #[test]
    fn test_empty_target_is_config_error() {
        let toml_str = r#"
            [mappings]
            "Nothing" = []
        "#;
        assert!(NameMappings::from_toml_str(toml_str, "n.toml").is_err());
    }
}
