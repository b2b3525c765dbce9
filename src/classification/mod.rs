//! Legal status classification
//!
//! A pure function of the resulting licenses, the detection status and the
//! catalog. Running it twice on the same input gives the same status.

use crate::archive::{Archive, LicenseMap};
use crate::catalog::Catalogs;
use crate::license::{DetectionStatus, LegalStatus};

/// Aggregate a legal status:
///
/// - an override's explicit status always wins
/// - no resulting license → `unknown`
/// - one license → its configured status (`unknown` when not in the catalog)
/// - several licenses sharing one status → that status
/// - several licenses with differing statuses → `conflicting`
pub fn classify(
    resulting: &LicenseMap,
    detection_status: Option<&DetectionStatus>,
    catalogs: &Catalogs,
) -> LegalStatus {
    if let Some(status) = detection_status.and_then(DetectionStatus::explicit_legal_status) {
        return status.clone();
    }

    let mut statuses = resulting.keys().map(|id| catalogs.legal_status_of(id));
    let Some(first) = statuses.next() else {
        return LegalStatus::unknown();
    };
    if statuses.all(|s| s == first) {
        first
    } else {
        LegalStatus::conflicting()
    }
}

/// Classify `archive` and store the result on it
pub fn classify_archive(archive: &mut Archive, catalogs: &Catalogs) -> LegalStatus {
    let status = classify(
        archive.resulting_licenses(),
        archive.detection_status(),
        catalogs,
    );
    archive.set_legal_status(status.clone());
    status
}
