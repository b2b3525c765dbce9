//! Run-level policy: `licensescout.toml`
//!
//! Two independent switches evaluated after the whole batch is processed:
//!
//! - **clean output** removes archives with excluded legal statuses or
//!   SPDX identifiers from the reportable view
//! - **fail on error** turns archives with an error legal status into a
//!   failed run

use crate::archive::Archive;
use crate::catalog::Catalogs;
use crate::license::LegalStatus;
use crate::{ScoutError, ScoutResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const POLICY_FILE_NAME: &str = "licensescout.toml";

/// Project-level run policy (loaded from `licensescout.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub clean_output: CleanOutputConfig,

    #[serde(default)]
    pub fail_on_error: FailOnErrorConfig,

    /// Leave archives of filtered vendors out of the reportable view
    #[serde(default = "default_true")]
    pub omit_vendor_filtered: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            clean_output: CleanOutputConfig::default(),
            fail_on_error: FailOnErrorConfig::default(),
            omit_vendor_filtered: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanOutputConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Legal statuses dropped from the reportable view
    #[serde(default)]
    pub legal_statuses: Vec<LegalStatus>,
    /// SPDX identifiers dropped from the reportable view
    #[serde(default)]
    pub spdx_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailOnErrorConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Legal statuses that fail the run
    #[serde(default)]
    pub legal_statuses: Vec<LegalStatus>,
}

/// Evaluates the run policy against finalized archives
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    config: PolicyConfig,
    clean_statuses: HashSet<LegalStatus>,
    clean_spdx: HashSet<String>,
    error_statuses: HashSet<LegalStatus>,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        let clean_statuses = config.clean_output.legal_statuses.iter().cloned().collect();
        let clean_spdx = config
            .clean_output
            .spdx_identifiers
            .iter()
            .map(|s| s.trim().to_lowercase())
            .collect();
        let error_statuses = config.fail_on_error.legal_statuses.iter().cloned().collect();
        Self {
            config,
            clean_statuses,
            clean_spdx,
            error_statuses,
        }
    }

    /// Load policy from a TOML file
    pub fn from_file(path: &Path) -> ScoutResult<Self> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScoutError::config(&origin, format!("Failed to read policy file: {}", e)))?;
        let config: PolicyConfig = crate::catalog::parse_toml(&content, &origin)?;
        Ok(Self::new(config))
    }

    /// Load `licensescout.toml` from the project root; defaults when absent.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn from_project_root(root: &Path) -> ScoutResult<Self> {
        let policy_path = root.join(POLICY_FILE_NAME);
        if !policy_path.exists() {
            tracing::debug!("No {} in {}, using defaults", POLICY_FILE_NAME, root.display());
            return Ok(Self::new(PolicyConfig::default()));
        }
        let engine = Self::from_file(&policy_path)?;
        tracing::info!("Loaded policy from {}", policy_path.display());
        Ok(engine)
    }

    /// Every legal status named by the policy must be known to the catalog
    pub fn validate(&self, catalogs: &Catalogs) -> ScoutResult<()> {
        for status in self.clean_statuses.iter().chain(&self.error_statuses) {
            if !catalogs.is_known_status(status) {
                return Err(ScoutError::config(
                    POLICY_FILE_NAME,
                    format!("unknown legal status '{}'", status),
                ));
            }
        }
        Ok(())
    }

    /// Whether `archive` belongs in the reportable view
    pub fn is_reportable(&self, archive: &Archive, catalogs: &Catalogs) -> bool {
        if self.config.omit_vendor_filtered && archive.is_vendor_filtered() {
            return false;
        }
        if !self.config.clean_output.enabled {
            return true;
        }
        if archive
            .legal_status()
            .is_some_and(|status| self.clean_statuses.contains(status))
        {
            return false;
        }
        !archive.resulting_licenses().keys().any(|id| {
            let spdx = catalogs
                .license(id)
                .and_then(|l| l.spdx_identifier.as_deref())
                .unwrap_or(id.as_str());
            self.clean_spdx.contains(&spdx.trim().to_lowercase())
        })
    }

    /// Archives whose legal status fails the run; empty when the policy is off
    pub fn offending<'a>(&self, archives: &'a [Archive]) -> Vec<&'a Archive> {
        if !self.config.fail_on_error.enabled {
            return Vec::new();
        }
        archives
            .iter()
            .filter(|a| {
                a.legal_status()
                    .is_some_and(|status| self.error_statuses.contains(status))
            })
            .collect()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;
    use crate::license::{License, LicenseId, DetectionMethod};

    fn catalogs() -> Catalogs {
        Catalogs::new(
            vec![
                License::new("apache", "approved").with_spdx(Some("Apache-2.0")),
                License::new("GPL-3.0-only", "forbidden"),
            ],
            vec![LegalStatus::new("approved"), LegalStatus::new("forbidden")],
        )
        .unwrap()
    }

    fn archive(name: &str, license: &str, status: &str) -> Archive {
        let mut a = Archive::new(ArchiveType::Javascript, name, "1.0.0", name);
        a.add_detected_license(LicenseId::new(license), "LICENSE", DetectionMethod::Pattern);
        a.replace_resulting_licenses(a.detected_licenses().clone());
        a.set_legal_status(LegalStatus::new(status));
        a
    }

    #[test]
    fn test_default_policy_reports_everything() {
        let engine = PolicyEngine::new(PolicyConfig::default());
        let a = archive("a", "GPL-3.0-only", "forbidden");
        assert!(engine.is_reportable(&a, &catalogs()));
        assert!(engine.offending(std::slice::from_ref(&a)).is_empty());
    }

    #[test]
    fn test_clean_output_by_status_and_spdx() {
        let config = PolicyConfig {
            clean_output: CleanOutputConfig {
                enabled: true,
                legal_statuses: vec![LegalStatus::new("forbidden")],
                spdx_identifiers: vec!["apache-2.0".into()],
            },
            ..Default::default()
        };
        let engine = PolicyEngine::new(config);
        let catalogs = catalogs();
        assert!(!engine.is_reportable(&archive("a", "GPL-3.0-only", "forbidden"), &catalogs));
        assert!(!engine.is_reportable(&archive("b", "apache", "approved"), &catalogs));
        assert!(engine.is_reportable(&archive("c", "MIT", "unknown"), &catalogs));
    }

    #[test]
    fn test_vendor_filtered_archives_are_omitted() {
        let engine = PolicyEngine::new(PolicyConfig::default());
        let mut a = archive("a", "apache", "approved");
        a.mark_vendor_filtered();
        assert!(!engine.is_reportable(&a, &catalogs()));
    }

    #[test]
    fn test_offending_archives() {
        let config = PolicyConfig {
            fail_on_error: FailOnErrorConfig {
                enabled: true,
                legal_statuses: vec![LegalStatus::new("Forbidden")],
            },
            ..Default::default()
        };
        let engine = PolicyEngine::new(config);
        let archives = vec![
            archive("a", "apache", "approved"),
            archive("b", "GPL-3.0-only", "forbidden"),
        ];
        let offending = engine.offending(&archives);
        assert_eq!(offending.len(), 1);
        assert_eq!(offending[0].file_name(), "b");
    }

    #[test]
    fn test_unknown_status_fails_validation() {
        let config = PolicyConfig {
            fail_on_error: FailOnErrorConfig {
                enabled: true,
                legal_statuses: vec![LegalStatus::new("dangerous")],
            },
            ..Default::default()
        };
        assert!(PolicyEngine::new(config).validate(&catalogs()).is_err());
    }

    #[test]
    fn test_policy_toml_parse() {
        let toml_str = r#"
            omit_vendor_filtered = false

            [clean_output]
            enabled = true
            legal_statuses = ["approved"]
            spdx_identifiers = ["MIT"]

            [fail_on_error]
            enabled = true
            legal_statuses = ["forbidden", "unknown"]
        "#;
        let config: PolicyConfig = toml::from_str(toml_str).unwrap();
        assert!(config.clean_output.enabled);
        assert_eq!(config.fail_on_error.legal_statuses.len(), 2);
        assert!(!config.omit_vendor_filtered);

        let defaults: PolicyConfig = toml::from_str("").unwrap();
        assert!(defaults.omit_vendor_filtered);
        assert!(!defaults.fail_on_error.enabled);
    }

    #[test]
    fn test_from_project_root_defaults_when_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = PolicyEngine::from_project_root(dir.path()).unwrap();
        assert!(!engine.config().fail_on_error.enabled);
        assert!(engine.config().omit_vendor_filtered);
    }

    #[test]
    fn test_from_project_root_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(POLICY_FILE_NAME),
            "[fail_on_error]\nenabled = \"yes\"\nlegal_statuses = [\"forbidden\"]\n",
        )
        .unwrap();
        let err = PolicyEngine::from_project_root(dir.path()).unwrap_err();
        assert!(matches!(err, ScoutError::Config { .. }));
    }
}
