//! Archive record: the unit of work
//!
//! One discovered artifact plus the detection and classification state it
//! accumulates while it moves through the pipeline.

use crate::catalog::{Notice, Provider};
use crate::license::{DetectionMethod, DetectionStatus, LegalStatus, LicenseId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// License → file paths inside the archive where it was found
pub type LicenseMap = BTreeMap<LicenseId, Vec<String>>;

/// Path recorded for licenses that come from a checked-archive entry
pub const OVERRIDE_MARKER: &str = "<checked-archive>";

// ─── Archive Type ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveType {
    /// Packaged Java archive (`*.jar`)
    Java,
    /// Node package (directory under `node_modules`)
    Javascript,
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Java => write!(f, "JAVA"),
            Self::Javascript => write!(f, "JAVASCRIPT"),
        }
    }
}

// ─── Message Digest ────────────────────────────────────────────────

/// Content hash of an artifact, rendered as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MessageDigest(Vec<u8>);

impl MessageDigest {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// SHA-256 of the given content
    pub fn sha256(content: &[u8]) -> Self {
        Self(Sha256::digest(content).to_vec())
    }

    pub fn from_hex(hex_str: &str) -> Option<Self> {
        hex::decode(hex_str.trim()).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<MessageDigest> for String {
    fn from(digest: MessageDigest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for MessageDigest {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid hex digest '{}'", value))
    }
}

// ─── Archive ───────────────────────────────────────────────────────

/// A scanned artifact.
///
/// Identity fields are fixed at construction. `detected_licenses` only
/// grows; `resulting_licenses` is only ever replaced as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct Archive {
    archive_type: ArchiveType,
    file_name: String,
    version: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_digest: Option<MessageDigest>,

    detected_licenses: LicenseMap,
    /// Strongest method per detected license and path
    detection_methods: BTreeMap<LicenseId, BTreeMap<String, DetectionMethod>>,
    resulting_licenses: LicenseMap,
    detection_status: Option<DetectionStatus>,
    legal_status: Option<LegalStatus>,
    license_candidate_files: Vec<String>,

    vendor: Option<String>,
    documentation_url: Option<String>,
    provider: Option<Provider>,
    notice: Option<Notice>,
    author: Option<String>,
    license_text: Option<String>,
    /// Justification text from a checked-archive entry
    message: Option<String>,
    vendor_filtered: bool,
}

impl Archive {
    pub fn new(
        archive_type: ArchiveType,
        file_name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            archive_type,
            file_name: file_name.into(),
            version: version.into(),
            path: path.into(),
            message_digest: None,
            detected_licenses: LicenseMap::new(),
            detection_methods: BTreeMap::new(),
            resulting_licenses: LicenseMap::new(),
            detection_status: None,
            legal_status: None,
            license_candidate_files: Vec::new(),
            vendor: None,
            documentation_url: None,
            provider: None,
            notice: None,
            author: None,
            license_text: None,
            message: None,
            vendor_filtered: false,
        }
    }

    pub fn with_digest(mut self, digest: MessageDigest) -> Self {
        self.message_digest = Some(digest);
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    // ── Identity ──

    pub fn archive_type(&self) -> ArchiveType {
        self.archive_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn message_digest(&self) -> Option<&MessageDigest> {
        self.message_digest.as_ref()
    }

    /// Hex digest, or an empty string when none was computed
    pub fn message_digest_string(&self) -> String {
        self.message_digest
            .as_ref()
            .map(MessageDigest::to_hex)
            .unwrap_or_default()
    }

    // ── Detection state ──

    /// Record that `license` was found in `path`. Repeated paths are kept once.
    pub fn add_detected_license(&mut self, license: LicenseId, path: &str, method: DetectionMethod) {
        let paths = self.detected_licenses.entry(license.clone()).or_default();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
        let strongest = self
            .detection_methods
            .entry(license)
            .or_default()
            .entry(path.to_string())
            .or_insert(method);
        if method > *strongest {
            *strongest = method;
        }
    }

    pub fn add_license_candidate_file(&mut self, path: impl Into<String>) {
        self.license_candidate_files.push(path.into());
    }

    pub fn detected_licenses(&self) -> &LicenseMap {
        &self.detected_licenses
    }

    /// Strongest detection method recorded for `license` across all paths
    pub fn detection_method(&self, license: &LicenseId) -> Option<DetectionMethod> {
        self.detection_methods.get(license)?.values().copied().max()
    }

    /// Strongest detection method recorded for `license` in `path`
    pub fn detection_method_in(&self, license: &LicenseId, path: &str) -> Option<DetectionMethod> {
        self.detection_methods.get(license)?.get(path).copied()
    }

    pub fn license_candidate_files(&self) -> &[String] {
        &self.license_candidate_files
    }

    // ── Resolution state ──

    /// Swap in a freshly built resulting-license map
    pub fn replace_resulting_licenses(&mut self, licenses: LicenseMap) {
        self.resulting_licenses = licenses;
    }

    pub fn resulting_licenses(&self) -> &LicenseMap {
        &self.resulting_licenses
    }

    /// Paths recorded for `license` in the resulting licenses
    pub fn file_paths(&self, license: &LicenseId) -> &[String] {
        self.resulting_licenses
            .get(license)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_detection_status(&mut self, status: DetectionStatus) {
        self.detection_status = Some(status);
    }

    pub fn detection_status(&self) -> Option<&DetectionStatus> {
        self.detection_status.as_ref()
    }

    pub fn set_legal_status(&mut self, status: LegalStatus) {
        self.legal_status = Some(status);
    }

    pub fn legal_status(&self) -> Option<&LegalStatus> {
        self.legal_status.as_ref()
    }

    pub fn mark_vendor_filtered(&mut self) {
        self.vendor_filtered = true;
    }

    pub fn is_vendor_filtered(&self) -> bool {
        self.vendor_filtered
    }

    // ── Descriptive fields ──

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn set_vendor(&mut self, vendor: impl Into<String>) {
        self.vendor = Some(vendor.into());
    }

    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    pub fn set_documentation_url(&mut self, url: impl Into<String>) {
        self.documentation_url = Some(url.into());
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = Some(provider);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn license_text(&self) -> Option<&str> {
        self.license_text.as_deref()
    }

    pub fn set_license_text(&mut self, text: impl Into<String>) {
        self.license_text = Some(text.into());
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

/// Archives are equal when their file names match case-insensitively
impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        compare_archives(self, other) == Ordering::Equal
    }
}

impl Eq for Archive {}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({}, {})", self.file_name, self.version, self.archive_type, self.path)
    }
}

// ─── Ordering ──────────────────────────────────────────────────────

/// Case-insensitive file-name comparison used for report ordering
pub fn compare_file_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Report-order comparator for archives
pub fn compare_archives(a: &Archive, b: &Archive) -> Ordering {
    compare_file_names(&a.file_name, &b.file_name)
}

/// Sort into report order. The sort is stable, so archives with equal
/// names keep their discovery order.
pub fn sort_archives(archives: &mut [Archive]) {
    archives.sort_by(compare_archives);
}
