//! Filesystem discovery: single walk over a scan root
//!
//! Node packages are directories under `node_modules` holding a
//! `package.json`; Java archives are `*.jar` files. Jar extraction is out
//! of scope, so a jar only gets candidate files when a pre-extracted
//! directory is registered for it.

use super::{CandidateSource, Discovery};
use crate::archive::{Archive, ArchiveType, MessageDigest};
use crate::detection::manifest::MANIFEST_FILE_NAME;
use crate::detection::CandidateFile;
use crate::{ScoutError, ScoutResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

static JAR_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)-(\d[0-9A-Za-z.\-_]*)\.jar$").expect("valid jar version regex")
});

/// Candidate files are looked for this deep below an archive root
const CANDIDATE_MAX_DEPTH: usize = 3;

// ─── Discovery ─────────────────────────────────────────────────────

/// Finds `node_modules` packages and `*.jar` files below a scan root.
///
/// Neither source carries vendor information, so discovered archives have
/// no vendor and are never vendor filtered. Archives from a custom
/// [`Discovery`](super::Discovery) can carry one.
#[derive(Debug, Clone)]
pub struct FilesystemDiscovery {
    root: PathBuf,
    archive_type: Option<ArchiveType>,
}

impl FilesystemDiscovery {
    /// Discover both Node packages and Java archives below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive_type: None,
        }
    }

    /// Restrict discovery to one archive type
    pub fn only(mut self, archive_type: ArchiveType) -> Self {
        self.archive_type = Some(archive_type);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn wants(&self, archive_type: ArchiveType) -> bool {
        self.archive_type.map_or(true, |t| t == archive_type)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn node_package(&self, manifest_path: &Path) -> Option<Archive> {
        let package_dir = manifest_path.parent()?;
        if !is_node_package_dir(package_dir) {
            return None;
        }
        let bytes = match std::fs::read(manifest_path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", manifest_path.display(), e);
                return None;
            }
        };

        let manifest: Value = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!("Unparseable manifest {}: {}", manifest_path.display(), e);
            Value::Null
        });
        let dir_name = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = manifest
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(dir_name);
        let version = manifest
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut archive = Archive::new(
            ArchiveType::Javascript,
            name,
            version,
            self.relative(package_dir),
        )
        .with_digest(MessageDigest::sha256(&bytes));
        if let Some(author) = manifest_author(&manifest) {
            archive = archive.with_author(author);
        }
        Some(archive)
    }

    fn java_archive(&self, path: &Path) -> Archive {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let version = jar_version(&file_name).unwrap_or_default();
        let archive = Archive::new(ArchiveType::Java, file_name, version, self.relative(path));
        match std::fs::read(path) {
            Ok(bytes) => archive.with_digest(MessageDigest::sha256(&bytes)),
            Err(e) => {
                tracing::warn!("Cannot hash {}: {}", path.display(), e);
                archive
            }
        }
    }
}

impl Discovery for FilesystemDiscovery {
    fn discover(&self) -> ScoutResult<Vec<Archive>> {
        if !self.root.is_dir() {
            return Err(ScoutError::Discovery(format!(
                "Scan root does not exist: {}",
                self.root.display()
            )));
        }

        let mut archives = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if self.wants(ArchiveType::Javascript) && name == MANIFEST_FILE_NAME {
                archives.extend(self.node_package(path));
            } else if self.wants(ArchiveType::Java) && name.to_lowercase().ends_with(".jar") {
                archives.push(self.java_archive(path));
            }
        }

        tracing::info!(
            "Discovered {} archives under {}",
            archives.len(),
            self.root.display()
        );
        Ok(archives)
    }
}

/// `node_modules/<name>` or `node_modules/@scope/<name>`
fn is_node_package_dir(dir: &Path) -> bool {
    let parent_name = |p: &Path| {
        p.parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    };
    match parent_name(dir) {
        Some(parent) if parent == "node_modules" => true,
        Some(parent) if parent.starts_with('@') => dir
            .parent()
            .and_then(parent_name)
            .is_some_and(|n| n == "node_modules"),
        _ => false,
    }
}

fn manifest_author(manifest: &Value) -> Option<String> {
    match manifest.get("author")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Version suffix of a jar file name (`commons-io-2.11.0.jar` → `2.11.0`)
pub fn jar_version(file_name: &str) -> Option<String> {
    JAR_VERSION
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// ─── Candidate files ───────────────────────────────────────────────

/// Reads candidate files from archive directories below a root
#[derive(Debug, Clone)]
pub struct DirectoryCandidates {
    root: PathBuf,
    extracted: HashMap<String, PathBuf>,
}

impl DirectoryCandidates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extracted: HashMap::new(),
        }
    }

    /// Use `dir` as the unpacked content of the archive at `archive_path`
    pub fn with_extracted(mut self, archive_path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.extracted.insert(archive_path.into(), dir.into());
        self
    }
}

impl CandidateSource for DirectoryCandidates {
    fn candidates(&self, archive: &Archive) -> Vec<CandidateFile> {
        let dir = self
            .extracted
            .get(archive.path())
            .cloned()
            .unwrap_or_else(|| self.root.join(archive.path()));
        if !dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&dir)
            .max_depth(CANDIDATE_MAX_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != "node_modules")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_candidate_name(e))
            .map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(&dir)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                match std::fs::read(entry.path()) {
                    Ok(bytes) => CandidateFile::new(rel, bytes),
                    Err(e) => CandidateFile::unreadable(rel, e.to_string()),
                }
            })
            .collect()
    }
}

fn is_candidate_name(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy().to_uppercase();
    name.contains("LICENSE")
        || name.contains("LICENCE")
        || name.contains("COPYING")
        || name.contains("NOTICE")
        || name == "PACKAGE.JSON"
}
