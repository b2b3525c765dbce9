//! # Audit Engine: orchestrator
//!
//! - `pipeline`: shared [`ArchiveContext`] and the parallel per-archive run
//!
//! A run is: discovery → per-archive pipeline → case-insensitive sort →
//! clean-output view → fail-on-error check. Fatal errors abort before any
//! archive is processed; a fail-on-error hit is reported only after every
//! archive has been classified.

pub mod pipeline;

pub use pipeline::ArchiveContext;

use crate::archive::{sort_archives, Archive};
use crate::catalog::ConfigPaths;
use crate::discovery::{CandidateSource, Discovery};
use crate::license::LegalStatus;
use crate::policy::{PolicyConfig, PolicyEngine};
use crate::{ScoutError, ScoutResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ─── Stage Statistics ──────────────────────────────────────────────

/// Timing for a single stage of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStats {
    pub name: String,
    pub duration_ms: u64,
    pub archives: usize,
}

// ─── Outcome ───────────────────────────────────────────────────────

/// An archive that triggered the fail-on-error policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffendingArchive {
    pub file_name: String,
    pub version: String,
    pub path: String,
    pub legal_status: LegalStatus,
}

/// Deferred, batch-level failure carrying every offending archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub offending: Vec<OffendingArchive>,
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} archive(s) with error legal status", self.offending.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum AuditOutcome {
    Passed,
    Failed(PolicyViolation),
}

impl AuditOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ─── Report ────────────────────────────────────────────────────────

/// Finalized result of a run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Every archive, sorted by case-insensitive file name
    pub archives: Vec<Archive>,
    /// Indices into `archives` that survive clean output and vendor filtering
    pub reportable: Vec<usize>,
    pub outcome: AuditOutcome,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stage_stats: Vec<StageStats>,
    pub scanner_version: String,
}

impl AuditReport {
    /// Archives to hand to report writers
    pub fn reportable(&self) -> impl Iterator<Item = &Archive> {
        self.reportable.iter().map(|&i| &self.archives[i])
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_failed()
    }

    /// Turn a fail-on-error outcome into [`ScoutError::FailOnError`]
    pub fn check(&self) -> ScoutResult<()> {
        match &self.outcome {
            AuditOutcome::Passed => Ok(()),
            AuditOutcome::Failed(violation) => Err(ScoutError::FailOnError {
                offending: violation
                    .offending
                    .iter()
                    .map(|o| format!("{} {} ({})", o.file_name, o.version, o.legal_status))
                    .collect(),
            }),
        }
    }

    /// Like [`check`](Self::check) but hands the report back on success
    pub fn into_result(self) -> ScoutResult<Self> {
        self.check()?;
        Ok(self)
    }
}

// ─── Engine ────────────────────────────────────────────────────────

pub struct AuditEngine {
    context: ArchiveContext,
    policy: PolicyEngine,
}

impl AuditEngine {
    /// The policy's legal statuses are validated against the catalog here
    pub fn new(context: ArchiveContext, policy: PolicyEngine) -> ScoutResult<Self> {
        policy.validate(&context.catalogs)?;
        Ok(Self { context, policy })
    }

    /// Load catalogs and overrides from `paths`
    pub fn from_config(paths: &ConfigPaths, policy: PolicyConfig) -> ScoutResult<Self> {
        let context = ArchiveContext::load(paths)?;
        Self::new(context, PolicyEngine::new(policy))
    }

    pub fn context(&self) -> &ArchiveContext {
        &self.context
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Discover archives, then audit them. A discovery error aborts the run
    /// before any archive is processed.
    pub fn run(
        &self,
        discovery: &dyn Discovery,
        source: &dyn CandidateSource,
    ) -> ScoutResult<AuditReport> {
        let start = Instant::now();
        let (stats, discovered) = pipeline::run_stage_timed(
            "Discovery",
            |r: &ScoutResult<Vec<Archive>>| r.as_ref().map_or(0, Vec::len),
            || discovery.discover(),
        );
        let archives = discovered?;
        let mut report = self.audit(archives, source);
        report.stage_stats.insert(0, stats);
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Audit already discovered archives. Always completes the whole batch.
    pub fn audit(&self, archives: Vec<Archive>, source: &dyn CandidateSource) -> AuditReport {
        let start = Instant::now();
        tracing::info!("═══════════════════════════════════════════════════════");
        tracing::info!("License audit: {} archives", archives.len());
        tracing::info!("═══════════════════════════════════════════════════════");

        let mut stage_stats = Vec::new();

        let (stats, mut archives) = pipeline::run_stage_timed(
            "Detect / Resolve / Classify",
            |processed: &Vec<Archive>| processed.len(),
            || pipeline::process_all(&self.context, archives, source),
        );
        stage_stats.push(stats);

        sort_archives(&mut archives);

        let catalogs = &self.context.catalogs;
        let reportable: Vec<usize> = archives
            .iter()
            .enumerate()
            .filter(|(_, a)| self.policy.is_reportable(a, catalogs))
            .map(|(i, _)| i)
            .collect();

        let offending: Vec<OffendingArchive> = self
            .policy
            .offending(&archives)
            .into_iter()
            .map(|a| OffendingArchive {
                file_name: a.file_name().to_string(),
                version: a.version().to_string(),
                path: a.path().to_string(),
                legal_status: a.legal_status().cloned().unwrap_or_else(LegalStatus::unknown),
            })
            .collect();

        let outcome = if offending.is_empty() {
            AuditOutcome::Passed
        } else {
            tracing::warn!(
                "Fail on error: {} archive(s) with error legal status",
                offending.len()
            );
            AuditOutcome::Failed(PolicyViolation { offending })
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Audit complete: {} archives, {} reportable, {} in {}ms",
            archives.len(),
            reportable.len(),
            if outcome.is_failed() { "FAILED" } else { "passed" },
            duration_ms
        );

        AuditReport {
            archives,
            reportable,
            outcome,
            generated_at: Utc::now(),
            duration_ms,
            stage_stats,
            scanner_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;
    use crate::catalog::overrides::CheckedArchiveStore;
    use crate::catalog::Catalogs;
    use crate::discovery::NoCandidates;
    use crate::policy::FailOnErrorConfig;

    fn engine(policy: PolicyConfig) -> AuditEngine {
        let catalogs = Catalogs::new(vec![], vec![LegalStatus::new("approved")]).unwrap();
        let context = ArchiveContext::new(catalogs, CheckedArchiveStore::empty()).unwrap();
        AuditEngine::new(context, PolicyEngine::new(policy)).unwrap()
    }

    #[test]
    fn test_audit_sorts_and_passes_by_default() {
        let archives = vec![
            Archive::new(ArchiveType::Java, "b.jar", "1", "b"),
            Archive::new(ArchiveType::Java, "A.jar", "1", "a"),
        ];
        let report = engine(PolicyConfig::default()).audit(archives, &NoCandidates);
        let names: Vec<&str> = report.archives.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["A.jar", "b.jar"]);
        assert_eq!(report.outcome, AuditOutcome::Passed);
        assert_eq!(report.reportable().count(), 2);
        assert!(report.check().is_ok());
    }

    #[test]
    fn test_fail_on_error_outcome() {
        let policy = PolicyConfig {
            fail_on_error: FailOnErrorConfig {
                enabled: true,
                legal_statuses: vec![LegalStatus::unknown()],
            },
            ..Default::default()
        };
        let archives = vec![Archive::new(ArchiveType::Java, "x.jar", "2", "x")];
        let report = engine(policy).audit(archives, &NoCandidates);
        assert!(report.is_failed());
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, ScoutError::FailOnError { ref offending } if offending.len() == 1));
    }

    #[test]
    fn test_policy_with_unknown_status_is_rejected() {
        let policy = PolicyConfig {
            fail_on_error: FailOnErrorConfig {
                enabled: true,
                legal_statuses: vec![LegalStatus::new("nope")],
            },
            ..Default::default()
        };
        let catalogs = Catalogs::new(vec![], vec![]).unwrap();
        let context = ArchiveContext::new(catalogs, CheckedArchiveStore::empty()).unwrap();
        assert!(AuditEngine::new(context, PolicyEngine::new(policy)).is_err());
    }
}
