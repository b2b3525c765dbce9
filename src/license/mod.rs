//! License type system
//!
//! Identifiers, catalog license descriptors, the extensible legal status
//! and the detection status/method enumerations shared by every stage.

pub mod spdx_expression;

pub use spdx_expression::SpdxExpression;

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── License Identity ───────────────────────────────────────────────

/// Canonical license identifier as declared in the license catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(pub String);

impl LicenseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive lookup key
    pub fn key(&self) -> String {
        self.0.trim().to_lowercase()
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Legal Status ───────────────────────────────────────────────────

/// Risk category of an archive or a license.
///
/// The set of categories is declared by the license catalog (e.g.
/// `approved`, `needs-review`, `forbidden`). Only [`LegalStatus::UNKNOWN`]
/// and [`LegalStatus::CONFLICTING`] are built in, because the classifier
/// produces them on its own. Values are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LegalStatus(String);

impl LegalStatus {
    pub const UNKNOWN: &'static str = "unknown";
    pub const CONFLICTING: &'static str = "conflicting";

    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_lowercase())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn conflicting() -> Self {
        Self(Self::CONFLICTING.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the classifier can produce this status without the catalog declaring it
    pub fn is_builtin(&self) -> bool {
        self.0 == Self::UNKNOWN || self.0 == Self::CONFLICTING
    }
}

impl From<String> for LegalStatus {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for LegalStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<LegalStatus> for String {
    fn from(status: LegalStatus) -> Self {
        status.0
    }
}

impl fmt::Display for LegalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Detection ──────────────────────────────────────────────────────

/// How a single license was found in a candidate file.
///
/// Declaration order is confidence order: later variants are stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// File name looks like a known license file (lowest confidence)
    FileName,
    /// License declared in package metadata (package.json)
    Manifest,
    /// All signature patterns of the license occur in the normalized text
    Pattern,
    /// SHA-256 of the file equals a known checksum (highest confidence)
    Checksum,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileName => write!(f, "file-name"),
            Self::Manifest => write!(f, "manifest"),
            Self::Pattern => write!(f, "pattern"),
            Self::Checksum => write!(f, "checksum"),
        }
    }
}

/// How the resulting licenses of an archive were obtained
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum DetectionStatus {
    MatchedByChecksum,
    MatchedByPattern,
    MatchedByManifest,
    MatchedByFileName,
    /// A checked-archive entry replaced the detection. An explicit legal
    /// status from that entry always wins over the license-derived one.
    ManuallyOverridden {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legal_status: Option<LegalStatus>,
    },
    NotDetected,
    ConflictingMatch,
    /// Licenses were detected but every detection was suppressed by a global filter
    FilteredOut,
}

impl DetectionStatus {
    /// Status for a single resulting license found with `method`
    pub fn matched(method: DetectionMethod) -> Self {
        match method {
            DetectionMethod::Checksum => Self::MatchedByChecksum,
            DetectionMethod::Pattern => Self::MatchedByPattern,
            DetectionMethod::Manifest => Self::MatchedByManifest,
            DetectionMethod::FileName => Self::MatchedByFileName,
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, Self::ManuallyOverridden { .. })
    }

    /// Explicit legal status supplied by an override, if any
    pub fn explicit_legal_status(&self) -> Option<&LegalStatus> {
        match self {
            Self::ManuallyOverridden { legal_status } => legal_status.as_ref(),
            _ => None,
        }
    }

    /// Stable short name used for summaries and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::MatchedByChecksum => "matched-by-checksum",
            Self::MatchedByPattern => "matched-by-pattern",
            Self::MatchedByManifest => "matched-by-manifest",
            Self::MatchedByFileName => "matched-by-file-name",
            Self::ManuallyOverridden { .. } => "manually-overridden",
            Self::NotDetected => "not-detected",
            Self::ConflictingMatch => "conflicting-match",
            Self::FilteredOut => "filtered-out",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.explicit_legal_status() {
            Some(status) => write!(f, "{} ({})", self.label(), status),
            None => write!(f, "{}", self.label()),
        }
    }
}

// ─── License Descriptor ─────────────────────────────────────────────

/// A known license as loaded from the license catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    /// SPDX identifier, when the license has one
    #[serde(default, rename = "spdx")]
    pub spdx_identifier: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Configured risk category
    pub legal_status: LegalStatus,
    /// SHA-256 hex digests of canonical license files
    #[serde(default)]
    pub checksums: Vec<String>,
    /// Signature phrases; a file matches when all of them occur
    #[serde(default)]
    pub patterns: Vec<String>,
    /// File names that suggest this license (e.g. `LICENSE-MIT`)
    #[serde(default)]
    pub file_names: Vec<String>,
}

impl License {
    pub fn new(id: impl Into<String>, legal_status: impl Into<LegalStatus>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            spdx_identifier: Some(id.clone()),
            id: LicenseId::new(id),
            url: None,
            legal_status: legal_status.into(),
            checksums: Vec::new(),
            patterns: Vec::new(),
            file_names: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_spdx(mut self, spdx: Option<&str>) -> Self {
        self.spdx_identifier = spdx.map(str::to_string);
        self
    }

    pub fn with_checksum(mut self, sha256_hex: impl Into<String>) -> Self {
        self.checksums.push(sha256_hex.into());
        self
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns.extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    pub fn with_file_names(mut self, names: &[&str]) -> Self {
        self.file_names.extend(names.iter().map(|n| n.to_string()));
        self
    }
}
