//! JSON report renderer

use super::{summarize, ReportSummary};
use crate::archive::Archive;
use crate::engine::{AuditOutcome, AuditReport, StageStats};
use crate::ScoutResult;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    scanner_version: &'a str,
    summary: ReportSummary,
    outcome: &'a AuditOutcome,
    duration_ms: u64,
    stage_stats: &'a [StageStats],
    archives: Vec<&'a Archive>,
}

/// Render the summary and the reportable archives as pretty-printed JSON
pub fn render(report: &AuditReport) -> ScoutResult<String> {
    let doc = JsonReport {
        scanner_version: &report.scanner_version,
        summary: summarize(report),
        outcome: &report.outcome,
        duration_ms: report.duration_ms,
        stage_stats: &report.stage_stats,
        archives: report.reportable().collect(),
    };
    serde_json::to_string_pretty(&doc).map_err(crate::ScoutError::SerdeError)
}
