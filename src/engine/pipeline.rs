//! Per-archive pipeline: detect → resolve → classify
//!
//! Archives have no cross-archive dependency, so the batch runs on the
//! rayon pool against one immutable [`ArchiveContext`].

use super::StageStats;
use crate::archive::Archive;
use crate::catalog::overrides::CheckedArchiveStore;
use crate::catalog::{Catalogs, ConfigPaths};
use crate::classification::classify_archive;
use crate::detection::LicenseDetector;
use crate::discovery::CandidateSource;
use crate::resolution::ResolutionEngine;
use crate::ScoutResult;
use rayon::prelude::*;
use std::time::Instant;

// ─── Archive Context ───────────────────────────────────────────────

/// Immutable shared context, built once before the pool starts
pub struct ArchiveContext {
    pub catalogs: Catalogs,
    pub overrides: CheckedArchiveStore,
    pub detector: LicenseDetector,
}

impl ArchiveContext {
    pub fn new(catalogs: Catalogs, overrides: CheckedArchiveStore) -> ScoutResult<Self> {
        let detector = LicenseDetector::new(&catalogs)?;
        Ok(Self {
            catalogs,
            overrides,
            detector,
        })
    }

    /// Load every catalog and the override file
    pub fn load(paths: &ConfigPaths) -> ScoutResult<Self> {
        let catalogs = Catalogs::load(paths)?;
        let overrides = CheckedArchiveStore::load(&paths.checked_archives, &catalogs)?;
        Self::new(catalogs, overrides)
    }

    pub fn resolution(&self) -> ResolutionEngine<'_> {
        ResolutionEngine::new(&self.catalogs, &self.overrides)
    }
}

// ─── Pipeline Execution ────────────────────────────────────────────

/// Run one archive through detection, resolution and classification
pub fn process_archive(
    ctx: &ArchiveContext,
    mut archive: Archive,
    source: &dyn CandidateSource,
) -> Archive {
    let candidates = source.candidates(&archive);
    ctx.detector.detect(&mut archive, &candidates, &ctx.catalogs);
    ctx.resolution().resolve(&mut archive);
    let status = classify_archive(&mut archive, &ctx.catalogs);

    tracing::debug!(
        "{} {}: {} license(s), {}, legal status {}",
        archive.file_name(),
        archive.version(),
        archive.resulting_licenses().len(),
        archive
            .detection_status()
            .map(|s| s.label())
            .unwrap_or("unset"),
        status
    );
    archive
}

/// Process the whole batch in parallel. Output order equals input order.
pub fn process_all(
    ctx: &ArchiveContext,
    archives: Vec<Archive>,
    source: &dyn CandidateSource,
) -> Vec<Archive> {
    archives
        .into_par_iter()
        .map(|archive| process_archive(ctx, archive, source))
        .collect()
}

/// Execute a stage with timing and logging
pub fn run_stage_timed<T>(
    name: &str,
    items: impl FnOnce(&T) -> usize,
    stage: impl FnOnce() -> T,
) -> (StageStats, T) {
    let start = Instant::now();
    tracing::info!("→ {}", name);
    let output = stage();
    let duration_ms = start.elapsed().as_millis() as u64;
    let archives = items(&output);
    tracing::info!("  ✓ {} completed in {}ms ({} archives)", name, duration_ms, archives);
    (
        StageStats {
            name: name.to_string(),
            duration_ms,
            archives,
        },
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;
    use crate::detection::CandidateFile;
    use crate::discovery::InMemoryCandidates;
    use crate::license::{DetectionStatus, LegalStatus, License};

    fn context() -> ArchiveContext {
        let catalogs = Catalogs::new(
            vec![License::new("MIT", "approved").with_patterns(&["permission is hereby granted"])],
            vec![LegalStatus::new("approved")],
        )
        .unwrap();
        ArchiveContext::new(catalogs, CheckedArchiveStore::empty()).unwrap()
    }

    #[test]
    fn test_process_archive_sets_both_statuses() {
        let ctx = context();
        let source = InMemoryCandidates::new()
            .with("a.jar", CandidateFile::new("LICENSE", "Permission is hereby granted ..."));
        let archive = Archive::new(ArchiveType::Java, "a.jar", "1", "a.jar");
        let archive = process_archive(&ctx, archive, &source);
        assert_eq!(archive.detection_status(), Some(&DetectionStatus::MatchedByPattern));
        assert_eq!(archive.legal_status(), Some(&LegalStatus::new("approved")));
    }

    #[test]
    fn test_process_all_preserves_order() {
        let ctx = context();
        let archives: Vec<Archive> = (0..64)
            .map(|i| Archive::new(ArchiveType::Java, format!("a{}.jar", i), "1", format!("p{}", i)))
            .collect();
        let processed = process_all(&ctx, archives, &crate::discovery::NoCandidates);
        assert_eq!(processed.len(), 64);
        assert!(processed.iter().enumerate().all(|(i, a)| a.path() == format!("p{}", i)));
        assert!(processed
            .iter()
            .all(|a| a.legal_status() == Some(&LegalStatus::unknown())));
    }

    #[test]
    fn test_run_stage_timed() {
        let (stats, out) = run_stage_timed("Count", |v: &Vec<u8>| v.len(), || vec![1, 2, 3]);
        assert_eq!(stats.name, "Count");
        assert_eq!(stats.archives, 3);
        assert_eq!(out.len(), 3);
    }
}
