//! Collaborator interfaces feeding the pipeline
//!
//! [`Discovery`] yields archives with their identity and digest;
//! [`CandidateSource`] yields the license-candidate files of one archive.
//! Both are traits so build-tool integrations can plug in their own.

pub mod filesystem;

pub use filesystem::{DirectoryCandidates, FilesystemDiscovery};

use crate::archive::Archive;
use crate::detection::CandidateFile;
use crate::ScoutResult;
use std::collections::HashMap;

/// Produces the archives to audit. An error aborts the run before any
/// archive is processed.
pub trait Discovery {
    fn discover(&self) -> ScoutResult<Vec<Archive>>;
}

/// A pre-built archive list
impl Discovery for Vec<Archive> {
    fn discover(&self) -> ScoutResult<Vec<Archive>> {
        Ok(self.clone())
    }
}

/// Produces the candidate files of an archive. Called from worker threads.
pub trait CandidateSource: Send + Sync {
    fn candidates(&self, archive: &Archive) -> Vec<CandidateFile>;
}

/// Source for archives without any candidate files
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCandidates;

impl CandidateSource for NoCandidates {
    fn candidates(&self, _archive: &Archive) -> Vec<CandidateFile> {
        Vec::new()
    }
}

/// Candidate files registered up front, keyed by archive path
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidates {
    files: HashMap<String, Vec<CandidateFile>>,
}

impl InMemoryCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, archive_path: impl Into<String>, file: CandidateFile) {
        self.files.entry(archive_path.into()).or_default().push(file);
    }

    pub fn with(mut self, archive_path: impl Into<String>, file: CandidateFile) -> Self {
        self.insert(archive_path, file);
        self
    }
}

impl CandidateSource for InMemoryCandidates {
    fn candidates(&self, archive: &Archive) -> Vec<CandidateFile> {
        self.files.get(archive.path()).cloned().unwrap_or_default()
    }
}
