//! Report output: JSON and checked-archive skeleton
//!
//! Turns an [`AuditReport`] into machine-readable output. Only the
//! reportable view is rendered as JSON; the skeleton covers every archive
//! so that curators see the complete set.

pub mod json;
pub mod skeleton;

use crate::engine::AuditReport;
use crate::ScoutResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Summary plus reportable archives as pretty-printed JSON
    Json,
    /// `[[archive]]` TOML entries ready to curate into the override file
    CheckedArchiveSkeleton,
}

/// Counts per status over a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_archives: usize,
    pub reportable_archives: usize,
    pub vendor_filtered: usize,
    pub by_legal_status: BTreeMap<String, usize>,
    pub by_detection_status: BTreeMap<String, usize>,
    pub failed: bool,
    pub generated_at: DateTime<Utc>,
}

pub fn summarize(report: &AuditReport) -> ReportSummary {
    let mut by_legal_status = BTreeMap::new();
    let mut by_detection_status = BTreeMap::new();
    for archive in &report.archives {
        let legal = archive
            .legal_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "unset".to_string());
        *by_legal_status.entry(legal).or_insert(0) += 1;
        let detection = archive.detection_status().map_or("unset", |s| s.label());
        *by_detection_status.entry(detection.to_string()).or_insert(0) += 1;
    }

    ReportSummary {
        total_archives: report.archives.len(),
        reportable_archives: report.reportable.len(),
        vendor_filtered: report.archives.iter().filter(|a| a.is_vendor_filtered()).count(),
        by_legal_status,
        by_detection_status,
        failed: report.is_failed(),
        generated_at: report.generated_at,
    }
}

/// Write a report in the specified format
pub fn write_report(report: &AuditReport, format: ReportFormat, output: &Path) -> ScoutResult<()> {
    let content = render_report(report, format)?;
    std::fs::write(output, content)?;
    tracing::info!("Wrote report to {}", output.display());
    Ok(())
}

/// Render a report to a string
pub fn render_report(report: &AuditReport, format: ReportFormat) -> ScoutResult<String> {
    match format {
        ReportFormat::Json => json::render(report),
        ReportFormat::CheckedArchiveSkeleton => skeleton::render(&report.archives),
    }
}
