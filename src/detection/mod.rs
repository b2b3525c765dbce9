//! License detection inside an archive's candidate files
//!
//! Per file, strategies are tried strongest first and the first one that
//! yields anything wins:
//!
//! 1. SHA-256 checksum equal to a known license file
//! 2. All signature patterns of a license occur in the normalized text
//! 3. package.json license metadata
//! 4. File-name heuristic (`LICENSE-MIT`, `COPYING.LESSER`, ...)
//!
//! The detector only ever appends to `detected_licenses` and
//! `license_candidate_files`.

pub mod manifest;
pub mod matcher;

pub use matcher::{normalize_text, PatternMatcher};

use crate::archive::Archive;
use crate::catalog::Catalogs;
use crate::license::{DetectionMethod, LicenseId};
use crate::{ScoutError, ScoutResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ─── Candidate files ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateContent {
    Bytes(Vec<u8>),
    /// The file could not be read; the reason is kept for the log
    Unreadable(String),
}

/// A file inside an archive that may carry license information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Path relative to the archive root
    pub path: String,
    pub content: CandidateContent,
}

impl CandidateFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: CandidateContent::Bytes(content.into()),
        }
    }

    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: CandidateContent::Unreadable(reason.into()),
        }
    }
}

/// One license found in one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub license: LicenseId,
    pub path: String,
    pub method: DetectionMethod,
}

// ─── Detector ──────────────────────────────────────────────────────

/// Prefixes of conventional license file names
const LICENSE_FILE_STEMS: &[&str] = &["license", "licence", "copying"];

pub struct LicenseDetector {
    checksums: HashMap<String, LicenseId>,
    file_names: HashMap<String, LicenseId>,
    patterns: PatternMatcher,
}

impl LicenseDetector {
    /// Build the lookup indexes from the license catalog. A checksum or
    /// file name claimed by two different licenses is a config error.
    pub fn new(catalogs: &Catalogs) -> ScoutResult<Self> {
        let mut checksums = HashMap::new();
        let mut file_names = HashMap::new();

        for license in catalogs.licenses() {
            for checksum in &license.checksums {
                let key = checksum.trim().to_lowercase();
                if hex::decode(&key).is_err() {
                    return Err(ScoutError::config(
                        "license catalog",
                        format!("license '{}' has malformed checksum '{}'", license.id, checksum),
                    ));
                }
                claim(&mut checksums, key, &license.id, "checksum")?;
            }
            for name in &license.file_names {
                claim(&mut file_names, name.trim().to_lowercase(), &license.id, "file name")?;
            }
        }

        let patterns = PatternMatcher::new(catalogs.licenses())?;
        tracing::debug!(
            "Detector ready: {} checksums, {} patterns, {} file names",
            checksums.len(),
            patterns.pattern_count(),
            file_names.len()
        );

        Ok(Self {
            checksums,
            file_names,
            patterns,
        })
    }

    /// Detect licenses in a single candidate file
    pub fn detect_file(&self, file: &CandidateFile, catalogs: &Catalogs) -> Vec<Detection> {
        let bytes = match &file.content {
            CandidateContent::Bytes(bytes) => bytes,
            CandidateContent::Unreadable(reason) => {
                tracing::warn!("Skipping unreadable candidate file {}: {}", file.path, reason);
                return Vec::new();
            }
        };

        let found = |ids: Vec<LicenseId>, method| -> Vec<Detection> {
            ids.into_iter()
                .map(|license| Detection {
                    license,
                    path: file.path.clone(),
                    method,
                })
                .collect()
        };

        let checksum = hex::encode(Sha256::digest(bytes));
        if let Some(id) = self.checksums.get(&checksum) {
            return found(vec![id.clone()], DetectionMethod::Checksum);
        }

        let text = String::from_utf8_lossy(bytes);
        let by_pattern = self.patterns.matches(&text);
        if !by_pattern.is_empty() {
            return found(by_pattern, DetectionMethod::Pattern);
        }

        if manifest::is_manifest(&file.path) {
            let declared = manifest::detect(&text, &file.path, catalogs);
            if !declared.is_empty() {
                return found(declared, DetectionMethod::Manifest);
            }
        }

        found(self.detect_file_name(&file.path, catalogs), DetectionMethod::FileName)
    }

    /// File-name heuristic: an explicit catalog file name, or a license
    /// file stem followed by a license name (`LICENSE-MIT`, `LICENCE.BSD`).
    fn detect_file_name(&self, path: &str, catalogs: &Catalogs) -> Vec<LicenseId> {
        let name = file_name_of(path).to_lowercase();
        if let Some(id) = self.file_names.get(&name) {
            return vec![id.clone()];
        }

        let Some(rest) = LICENSE_FILE_STEMS
            .iter()
            .find_map(|stem| name.strip_prefix(stem))
        else {
            return Vec::new();
        };
        let suffix = rest
            .trim_start_matches(['-', '_', '.'])
            .trim_end_matches(".txt")
            .trim_end_matches(".md");
        if suffix.is_empty() {
            return Vec::new();
        }
        catalogs.resolve_name(suffix)
    }

    /// Run detection over every candidate file of `archive`
    pub fn detect(&self, archive: &mut Archive, candidates: &[CandidateFile], catalogs: &Catalogs) {
        for file in candidates {
            archive.add_license_candidate_file(file.path.clone());
            let detections = self.detect_file(file, catalogs);
            if detections.is_empty() {
                tracing::debug!("{}: no license in {}", archive.file_name(), file.path);
            }
            for detection in detections {
                archive.add_detected_license(detection.license, &detection.path, detection.method);
            }
        }
    }
}

fn claim(
    index: &mut HashMap<String, LicenseId>,
    key: String,
    id: &LicenseId,
    what: &str,
) -> ScoutResult<()> {
    match index.get(&key) {
        Some(existing) if existing != id => Err(ScoutError::config(
            "license catalog",
            format!("{} '{}' claimed by both '{}' and '{}'", what, key, existing, id),
        )),
        Some(_) => Ok(()),
        None => {
            index.insert(key, id.clone());
            Ok(())
        }
    }
}

/// Last path component, accepting both separators
pub(crate) fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
