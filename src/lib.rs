//! # licensescout: License Compliance Auditing
//!
//! Audits a dependency tree (Java archives or Node packages) for license
//! compliance. Every discovered archive passes through a fixed pipeline and
//! ends with exactly one detection status and one legal status.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AuditEngine                           │
//! │  ┌──────────┐ ┌──────────────┐ ┌──────────┐ ┌───────────┐   │
//! │  │Discovery │ │ArchiveContext│ │Policy    │ │ Report    │   │
//! │  │          │ │(read-only)   │ │Engine    │ │           │   │
//! │  └────┬─────┘ └──────┬───────┘ └────┬─────┘ └─────┬─────┘   │
//! │       │              │              │             │         │
//! │  ┌────▼──────────────▼──────────────┴─────────────┴──────┐  │
//! │  │  Per-archive pipeline (rayon parallel)                │  │
//! │  │  Detect → Resolve (overrides, filters) → Classify     │  │
//! │  └───────────────────────┬───────────────────────────────┘  │
//! │                          │                                  │
//! │  ┌───────────────────────▼───────────────────────────────┐  │
//! │  │ Sort (case-insensitive) → Clean output → Fail on error│  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! - **Checksum / pattern / file-name detection** of license files inside an archive
//! - **package.json metadata** detection with name and URL mapping tables
//! - **Checked archives**: manually curated overrides keyed by digest or name/version
//! - **Global and vendor filters** for known false positives
//! - **Legal status classification** driven by the license catalog's categories
//! - **Clean output / fail on error** run-level policies

pub mod archive;
pub mod license;
pub mod catalog;
pub mod detection;
pub mod resolution;
pub mod classification;
pub mod policy;
pub mod engine;
pub mod discovery;
pub mod report;

// Re-exports for convenience
pub use archive::{Archive, ArchiveType, LicenseMap, MessageDigest, compare_archives, sort_archives};
pub use license::{DetectionMethod, DetectionStatus, LegalStatus, License, LicenseId};
pub use catalog::{Catalogs, ConfigPaths, overrides::CheckedArchiveStore};
pub use detection::{CandidateFile, LicenseDetector};
pub use resolution::ResolutionEngine;
pub use classification::{classify, classify_archive};
pub use policy::{PolicyConfig, PolicyEngine};
pub use engine::{ArchiveContext, AuditEngine, AuditOutcome, AuditReport, OffendingArchive, PolicyViolation};
pub use discovery::{CandidateSource, Discovery, DirectoryCandidates, FilesystemDiscovery, InMemoryCandidates, NoCandidates};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Fail on error condition: {} archive(s) with error legal status: {}", .offending.len(), .offending.join(", "))]
    FailOnError { offending: Vec<String> },
}

impl ScoutError {
    pub(crate) fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type ScoutResult<T> = Result<T, ScoutError>;
