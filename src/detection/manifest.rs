//! package.json license metadata
//!
//! Handles the three shapes found in the wild:
//! `"license": "MIT OR Apache-2.0"`, `"license": { "type", "url" }` and the
//! legacy `"licenses": [ ... ]` array of strings or objects.

use crate::catalog::{mappings, Catalogs};
use crate::license::{LicenseId, SpdxExpression};
use serde_json::Value;

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Whether `path` names a Node package manifest
pub fn is_manifest(path: &str) -> bool {
    super::file_name_of(path).eq_ignore_ascii_case(MANIFEST_FILE_NAME)
}

/// One declared license: a name/expression and/or a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredLicense {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Extract every declared license from manifest JSON
pub fn declared_licenses(manifest: &Value) -> Vec<DeclaredLicense> {
    let mut declared = Vec::new();
    if let Some(value) = manifest.get("license") {
        declared.extend(declared_from(value));
    }
    if let Some(Value::Array(items)) = manifest.get("licenses") {
        for item in items {
            declared.extend(declared_from(item));
        }
    }
    declared
}

fn declared_from(value: &Value) -> Option<DeclaredLicense> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(if mappings::looks_like_url(s) {
            DeclaredLicense {
                name: None,
                url: Some(s.trim().to_string()),
            }
        } else {
            DeclaredLicense {
                name: Some(s.trim().to_string()),
                url: None,
            }
        }),
        Value::Object(obj) => {
            let name = obj.get("type").and_then(Value::as_str).map(str::trim);
            let url = obj.get("url").and_then(Value::as_str).map(str::trim);
            if name.map_or(true, str::is_empty) && url.map_or(true, str::is_empty) {
                return None;
            }
            Some(DeclaredLicense {
                name: name.filter(|s| !s.is_empty()).map(str::to_string),
                url: url.filter(|s| !s.is_empty()).map(str::to_string),
            })
        }
        _ => None,
    }
}

/// Map a declared license onto catalog ids.
///
/// The whole name goes through the mappings first, so aliases containing
/// "or"/"and" still resolve; otherwise the SPDX expression is split and
/// each identifier resolved on its own. The URL is the fallback.
pub fn resolve_declared(declared: &DeclaredLicense, catalogs: &Catalogs) -> Vec<LicenseId> {
    let mut ids = Vec::new();
    if let Some(name) = &declared.name {
        ids = catalogs.resolve_name(name);
        if ids.is_empty() {
            if let Some(expr) = SpdxExpression::parse(name) {
                for part in expr.license_ids() {
                    for id in catalogs.resolve_name(part) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
            }
        }
    }
    if ids.is_empty() {
        if let Some(url) = &declared.url {
            ids = catalogs.resolve_url(url);
        }
    }
    ids
}

/// Licenses declared by a package.json body. Invalid JSON yields nothing.
pub fn detect(content: &str, path: &str, catalogs: &Catalogs) -> Vec<LicenseId> {
    let manifest: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Unparseable manifest {}: {}", path, e);
            return Vec::new();
        }
    };

    let mut ids = Vec::new();
    for declared in declared_licenses(&manifest) {
        let resolved = resolve_declared(&declared, catalogs);
        if resolved.is_empty() {
            tracing::debug!("Manifest {} declares unmapped license {:?}", path, declared);
        }
        for id in resolved {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NameMappings, UrlMappings};
    use crate::license::{LegalStatus, License};

    fn catalogs() -> Catalogs {
        let mut names = NameMappings::default();
        names.insert("Apache License, Version 2.0", &["Apache-2.0"]);
        let mut urls = UrlMappings::default();
        urls.insert("https://opensource.org/licenses/BSD-3-Clause", &["BSD-3-Clause"]);
        Catalogs::new(
            vec![
                License::new("Apache-2.0", "approved"),
                License::new("MIT", "approved"),
                License::new("BSD-3-Clause", "approved"),
            ],
            vec![LegalStatus::new("approved")],
        )
        .unwrap()
        .with_name_mappings(names)
        .with_url_mappings(urls)
    }

    #[test]
    fn test_license_string_with_expression() {
        let ids = detect(r#"{"name":"x","license":"(MIT OR Apache-2.0)"}"#, "package.json", &catalogs());
        assert_eq!(ids, vec![LicenseId::new("MIT"), LicenseId::new("Apache-2.0")]);
    }

    #[test]
    fn test_license_object_and_legacy_array() {
        let content = r#"{
            "license": { "type": "Apache License, Version 2.0" },
            "licenses": [
                { "type": "Custom", "url": "http://opensource.org/licenses/BSD-3-Clause/" },
                "MIT"
            ]
        }"#;
        let ids = detect(content, "package.json", &catalogs());
        assert_eq!(
            ids,
            vec![
                LicenseId::new("Apache-2.0"),
                LicenseId::new("BSD-3-Clause"),
                LicenseId::new("MIT"),
            ]
        );
    }

    #[test]
    fn test_unmapped_and_invalid_manifests() {
        assert!(detect(r#"{"license":"UNLICENSED"}"#, "package.json", &catalogs()).is_empty());
        assert!(detect("{ not json", "package.json", &catalogs()).is_empty());
        assert!(detect(r#"{"name":"x"}"#, "package.json", &catalogs()).is_empty());
    }

    #[test]
    fn test_oversized_expressions_do_not_abort() {
        let long = vec!["MIT"; 20_000].join(" OR ");
        let content = serde_json::json!({ "license": long }).to_string();
        assert_eq!(detect(&content, "package.json", &catalogs()), vec![LicenseId::new("MIT")]);

        let deep = format!("{}MIT{}", "(".repeat(5_000), ")".repeat(5_000));
        let content = serde_json::json!({ "license": deep }).to_string();
        assert!(detect(&content, "package.json", &catalogs()).is_empty());
    }

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest("node_modules/x/package.json"));
        assert!(is_manifest("Package.JSON"));
        assert!(!is_manifest("package.json.bak"));
    }
}
