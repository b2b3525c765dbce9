//! Checked-archive override store
//!
//! Manually curated verdicts for archives whose automatic detection is
//! wrong or incomplete. Entries are keyed by content digest, or by file
//! name plus version where the version may be the wildcard `*`.
//!
//! ```toml
//! [[archive]]
//! file_name = "commons-io.jar"
//! version = "*"
//! licenses = ["Apache-2.0"]
//! message = "Checked manually against upstream distribution"
//! ```

use super::{Catalogs, Notice, Provider};
use crate::archive::{Archive, MessageDigest};
use crate::license::{LegalStatus, LicenseId};
use crate::{ScoutError, ScoutResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Version wildcard matching every version of an archive
pub const ANY_VERSION: &str = "*";

fn any_version() -> String {
    ANY_VERSION.to_string()
}

/// One `[[archive]]` entry as written in the override file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedArchiveEntry {
    pub file_name: String,
    #[serde(default = "any_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// License names or ids; resolved through the name mappings
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<LegalStatus>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CheckedArchiveFile {
    #[serde(default)]
    pub(crate) archive: Vec<CheckedArchiveEntry>,
}

/// A validated override with every reference resolved against the catalogs
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedArchive {
    pub file_name: String,
    pub version: String,
    pub digest: Option<MessageDigest>,
    pub licenses: Vec<LicenseId>,
    pub legal_status: Option<LegalStatus>,
    pub message: String,
    pub vendor: Option<String>,
    pub provider: Option<Provider>,
    pub notice: Option<Notice>,
    pub documentation_url: Option<String>,
}

impl CheckedArchive {
    pub fn is_wildcard_version(&self) -> bool {
        self.version == ANY_VERSION
    }
}

/// Read-only override table shared by every worker
#[derive(Debug, Clone, Default)]
pub struct CheckedArchiveStore {
    entries: Vec<CheckedArchive>,
    by_digest: HashMap<Vec<u8>, usize>,
    by_name: HashMap<(String, String), usize>,
}

impl CheckedArchiveStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the override file; an absent file yields an empty store
    pub fn load(path: &Path, catalogs: &Catalogs) -> ScoutResult<Self> {
        let origin = path.display().to_string();
        let store = match super::read_optional(path)? {
            Some(content) => Self::from_toml_str(&content, &origin, catalogs)?,
            None => Self::empty(),
        };
        tracing::info!("Loaded {} checked archives from {}", store.len(), origin);
        Ok(store)
    }

    pub fn from_toml_str(content: &str, origin: &str, catalogs: &Catalogs) -> ScoutResult<Self> {
        let file: CheckedArchiveFile = super::parse_toml(content, origin)?;
        Self::from_entries(file.archive, origin, catalogs)
    }

    /// Validate and index raw entries. Unknown licenses, statuses, providers
    /// or notices, malformed digests and duplicate keys are config errors.
    pub fn from_entries(
        entries: Vec<CheckedArchiveEntry>,
        origin: &str,
        catalogs: &Catalogs,
    ) -> ScoutResult<Self> {
        let mut store = Self::default();
        for entry in entries {
            let resolved = resolve_entry(entry, origin, catalogs)?;
            store.insert(resolved, origin)?;
        }
        Ok(store)
    }

    fn insert(&mut self, entry: CheckedArchive, origin: &str) -> ScoutResult<()> {
        let idx = self.entries.len();
        if let Some(digest) = &entry.digest {
            if self.by_digest.insert(digest.as_bytes().to_vec(), idx).is_some() {
                return Err(ScoutError::config(
                    origin,
                    format!("duplicate checked archive digest '{}'", digest),
                ));
            }
        } else {
            let key = name_key(&entry.file_name, &entry.version);
            if self.by_name.insert(key, idx).is_some() {
                return Err(ScoutError::config(
                    origin,
                    format!(
                        "duplicate checked archive '{}' version '{}'",
                        entry.file_name, entry.version
                    ),
                ));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Find the override for `archive`: digest first, then exact
    /// name/version, then name with the version wildcard.
    pub fn lookup(&self, archive: &Archive) -> Option<&CheckedArchive> {
        if let Some(digest) = archive.message_digest() {
            if let Some(&idx) = self.by_digest.get(digest.as_bytes()) {
                return Some(&self.entries[idx]);
            }
        }
        self.by_name
            .get(&name_key(archive.file_name(), archive.version()))
            .or_else(|| self.by_name.get(&name_key(archive.file_name(), ANY_VERSION)))
            .map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[CheckedArchive] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn name_key(file_name: &str, version: &str) -> (String, String) {
    (file_name.trim().to_lowercase(), version.trim().to_string())
}

fn resolve_entry(
    entry: CheckedArchiveEntry,
    origin: &str,
    catalogs: &Catalogs,
) -> ScoutResult<CheckedArchive> {
    let label = format!("checked archive '{}'", entry.file_name);
    if entry.file_name.trim().is_empty() {
        return Err(ScoutError::config(origin, "checked archive without file_name"));
    }
    if entry.licenses.is_empty() && entry.legal_status.is_none() {
        return Err(ScoutError::config(
            origin,
            format!("{} needs licenses or a legal_status", label),
        ));
    }

    let digest = match entry.digest.as_deref().map(str::trim) {
        None | Some("") | Some(ANY_VERSION) => None,
        Some(hex_str) => Some(MessageDigest::from_hex(hex_str).ok_or_else(|| {
            ScoutError::config(origin, format!("{} has malformed digest '{}'", label, hex_str))
        })?),
    };

    let mut licenses: Vec<LicenseId> = Vec::new();
    for name in &entry.licenses {
        let ids = catalogs.resolve(name);
        if ids.is_empty() {
            return Err(ScoutError::config(
                origin,
                format!("{} references unknown license '{}'", label, name),
            ));
        }
        for id in ids {
            if !licenses.contains(&id) {
                licenses.push(id);
            }
        }
    }

    if let Some(status) = &entry.legal_status {
        if !catalogs.is_known_status(status) {
            return Err(ScoutError::config(
                origin,
                format!("{} has unknown legal status '{}'", label, status),
            ));
        }
    }

    let provider = match &entry.provider {
        Some(id) => Some(catalogs.provider(id).cloned().ok_or_else(|| {
            ScoutError::config(origin, format!("{} references unknown provider '{}'", label, id))
        })?),
        None => None,
    };
    let notice = match &entry.notice {
        Some(id) => Some(catalogs.notice(id).cloned().ok_or_else(|| {
            ScoutError::config(origin, format!("{} references unknown notice '{}'", label, id))
        })?),
        None => None,
    };

    Ok(CheckedArchive {
        file_name: entry.file_name,
        version: entry.version,
        digest,
        licenses,
        legal_status: entry.legal_status,
        message: entry.message,
        vendor: entry.vendor,
        provider,
        notice,
        documentation_url: entry.documentation_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;
    use crate::license::License;

    fn catalogs() -> Catalogs {
        let mut names = super::super::NameMappings::default();
        names.insert("Apache License, Version 2.0", &["Apache-2.0"]);
        Catalogs::new(
            vec![
                License::new("Apache-2.0", "approved"),
                License::new("MIT", "approved"),
            ],
            vec![LegalStatus::new("approved"), LegalStatus::new("forbidden")],
        )
        .unwrap()
        .with_name_mappings(names)
        .with_providers(vec![Provider {
            id: "asf".into(),
            name: "Apache Software Foundation".into(),
            url: None,
        }])
    }

    const OVERRIDES: &str = r#"
        [[archive]]
        file_name = "commons-io.jar"
        licenses = ["Apache License, Version 2.0"]
        provider = "asf"
        message = "verified"

        [[archive]]
        file_name = "commons-io.jar"
        version = "2.11.0"
        licenses = ["MIT"]

        [[archive]]
        file_name = "blob.jar"
        digest = "abcdef"
        legal_status = "forbidden"
        message = "binary blob"
    "#;

    #[test]
    fn test_lookup_precedence() {
        let store = CheckedArchiveStore::from_toml_str(OVERRIDES, "checked.toml", &catalogs()).unwrap();
        assert_eq!(store.len(), 3);

        let exact = Archive::new(ArchiveType::Java, "Commons-IO.jar", "2.11.0", "a");
        assert_eq!(store.lookup(&exact).unwrap().licenses, vec![LicenseId::new("MIT")]);

        let other = Archive::new(ArchiveType::Java, "commons-io.jar", "2.4", "a");
        let hit = store.lookup(&other).unwrap();
        assert!(hit.is_wildcard_version());
        assert_eq!(hit.licenses, vec![LicenseId::new("Apache-2.0")]);
        assert_eq!(hit.provider.as_ref().map(|p| p.id.as_str()), Some("asf"));

        let by_digest = Archive::new(ArchiveType::Java, "renamed.jar", "0", "a")
            .with_digest(MessageDigest::from_hex("ABCDEF").unwrap());
        let hit = store.lookup(&by_digest).unwrap();
        assert_eq!(hit.legal_status, Some(LegalStatus::new("forbidden")));

        let miss = Archive::new(ArchiveType::Java, "guava.jar", "31", "a");
        assert!(store.lookup(&miss).is_none());
    }

    #[test]
    fn test_digest_entry_wins_over_name_and_version() {
        let store = CheckedArchiveStore::from_toml_str(OVERRIDES, "checked.toml", &catalogs()).unwrap();

        let both = Archive::new(ArchiveType::Java, "commons-io.jar", "2.11.0", "a")
            .with_digest(MessageDigest::from_hex("abcdef").unwrap());
        let hit = store.lookup(&both).unwrap();
        assert_eq!(hit.legal_status, Some(LegalStatus::new("forbidden")));
        assert!(hit.licenses.is_empty());

        let other_digest = Archive::new(ArchiveType::Java, "commons-io.jar", "2.11.0", "a")
            .with_digest(MessageDigest::from_hex("123456").unwrap());
        let hit = store.lookup(&other_digest).unwrap();
        assert_eq!(hit.licenses, vec![LicenseId::new("MIT")]);
    }

    #[test]
    fn test_unknown_license_is_config_error() {
        let toml_str = r#"
            [[archive]]
            file_name = "x.jar"
            licenses = ["Beerware"]
        "#;
        let err = CheckedArchiveStore::from_toml_str(toml_str, "checked.toml", &catalogs()).unwrap_err();
        assert!(err.to_string().contains("Beerware"));
    }

    #[test]
    fn test_entry_without_verdict_is_rejected() {
        let toml_str = r#"
            [[archive]]
            file_name = "x.jar"
            message = "nothing"
        "#;
        assert!(CheckedArchiveStore::from_toml_str(toml_str, "checked.toml", &catalogs()).is_err());
    }

    #[test]
    fn test_duplicate_name_version_is_rejected() {
        let toml_str = r#"
            [[archive]]
            file_name = "x.jar"
            licenses = ["MIT"]

            [[archive]]
            file_name = "X.jar"
            licenses = ["Apache-2.0"]
        "#;
        assert!(CheckedArchiveStore::from_toml_str(toml_str, "checked.toml", &catalogs()).is_err());
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store =
            CheckedArchiveStore::load(&dir.path().join("checked_archives.toml"), &catalogs()).unwrap();
        assert!(store.is_empty());
    }
}
