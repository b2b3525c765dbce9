//! Resolution of detected licenses into resulting licenses
//!
//! Steps, in order:
//!
//! 1. Checked-archive override (digest, then name/version). When found the
//!    override's licenses replace everything and the remaining steps are
//!    skipped.
//! 2. Vendor filtering: flags the archive, never removes it.
//! 3. Global filtering: drops detections whose path or license matches.
//! 4. Default copy of what survived, with a detection status derived from it.
//!
//! Afterwards a single resulting license is enriched with its catalog text
//! and URL. `detected_licenses` is never touched.

use crate::archive::{Archive, LicenseMap, OVERRIDE_MARKER};
use crate::catalog::overrides::{CheckedArchive, CheckedArchiveStore};
use crate::catalog::Catalogs;
use crate::license::{DetectionMethod, DetectionStatus};

pub struct ResolutionEngine<'a> {
    catalogs: &'a Catalogs,
    overrides: &'a CheckedArchiveStore,
}

impl<'a> ResolutionEngine<'a> {
    pub fn new(catalogs: &'a Catalogs, overrides: &'a CheckedArchiveStore) -> Self {
        Self {
            catalogs,
            overrides,
        }
    }

    /// Compute `resulting_licenses` and `detection_status` for `archive`.
    /// Re-running on the same archive gives the same result.
    pub fn resolve(&self, archive: &mut Archive) {
        if let Some(entry) = self.overrides.lookup(archive) {
            tracing::debug!("{}: checked archive override applies", archive.file_name());
            apply_override(archive, entry);
        } else {
            self.filter_vendor(archive);
            let (resulting, filtered) = self.apply_global_filters(archive);
            let status = derive_status(archive, &resulting, filtered);
            archive.replace_resulting_licenses(resulting);
            archive.set_detection_status(status);
        }
        self.enrich(archive);
    }

    fn filter_vendor(&self, archive: &mut Archive) {
        let filtered = archive
            .vendor()
            .is_some_and(|vendor| self.catalogs.vendor_filter().matches(vendor));
        if filtered {
            tracing::debug!("{}: vendor filtered", archive.file_name());
            archive.mark_vendor_filtered();
        }
    }

    /// Detected minus globally filtered; also returns how many
    /// (license, path) detections were dropped.
    fn apply_global_filters(&self, archive: &Archive) -> (LicenseMap, usize) {
        let filters = self.catalogs.global_filters();
        let mut resulting = LicenseMap::new();
        let mut dropped = 0usize;

        for (license, paths) in archive.detected_licenses() {
            let kept: Vec<String> = paths
                .iter()
                .filter(|path| match filters.matching(license, path) {
                    Some(pattern) => {
                        tracing::debug!(
                            "{}: {} in {} suppressed by filter '{}'",
                            archive.file_name(),
                            license,
                            path,
                            pattern
                        );
                        dropped += 1;
                        false
                    }
                    None => true,
                })
                .cloned()
                .collect();
            if !kept.is_empty() {
                resulting.insert(license.clone(), kept);
            }
        }
        (resulting, dropped)
    }

    fn enrich(&self, archive: &mut Archive) {
        let mut licenses = archive.resulting_licenses().keys();
        let (Some(single), None) = (licenses.next(), licenses.next()) else {
            return;
        };
        let single = single.clone();
        if archive.license_text().is_none() {
            if let Some(text) = self.catalogs.license_text(&single) {
                archive.set_license_text(text);
            }
        }
        if archive.documentation_url().is_none() {
            if let Some(url) = self.catalogs.license(&single).and_then(|l| l.url.clone()) {
                archive.set_documentation_url(url);
            }
        }
    }
}

fn apply_override(archive: &mut Archive, entry: &CheckedArchive) {
    let resulting: LicenseMap = entry
        .licenses
        .iter()
        .map(|id| (id.clone(), vec![OVERRIDE_MARKER.to_string()]))
        .collect();
    archive.replace_resulting_licenses(resulting);
    archive.set_detection_status(DetectionStatus::ManuallyOverridden {
        legal_status: entry.legal_status.clone(),
    });

    if let Some(vendor) = &entry.vendor {
        archive.set_vendor(vendor.clone());
    }
    if let Some(provider) = &entry.provider {
        archive.set_provider(provider.clone());
    }
    if let Some(notice) = &entry.notice {
        archive.set_notice(notice.clone());
    }
    if let Some(url) = &entry.documentation_url {
        archive.set_documentation_url(url.clone());
    }
    if !entry.message.is_empty() {
        archive.set_message(entry.message.clone());
    }
}

/// Status of the surviving detections. The method of a single license is
/// the strongest one among the paths that were kept.
fn derive_status(archive: &Archive, resulting: &LicenseMap, dropped: usize) -> DetectionStatus {
    match resulting.iter().next() {
        None if dropped > 0 => DetectionStatus::FilteredOut,
        None => DetectionStatus::NotDetected,
        Some((id, paths)) if resulting.len() == 1 => {
            let method = paths
                .iter()
                .filter_map(|path| archive.detection_method_in(id, path))
                .max()
                .unwrap_or(DetectionMethod::FileName);
            DetectionStatus::matched(method)
        }
        Some(_) => DetectionStatus::ConflictingMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;
    use crate::catalog::{FilterKind, FilterTarget, GlobalFilters, VendorFilter};
    use crate::license::{LegalStatus, License, LicenseId};

    fn catalogs() -> Catalogs {
        let mut filters = GlobalFilters::default();
        filters.push("src/test/", FilterKind::Substring, FilterTarget::Path).unwrap();
        Catalogs::new(
            vec![
                License::new("MIT", "approved").with_url("https://opensource.org/licenses/MIT"),
                License::new("GPL-2.0-only", "forbidden"),
            ],
            vec![LegalStatus::new("approved"), LegalStatus::new("forbidden")],
        )
        .unwrap()
        .with_global_filters(filters)
        .with_vendor_filter(VendorFilter::new(["Acme"]))
        .with_license_texts(vec![(LicenseId::new("MIT"), "MIT text".to_string())])
    }

    fn detected(entries: &[(&str, &str, DetectionMethod)]) -> Archive {
        let mut archive = Archive::new(ArchiveType::Java, "lib.jar", "1.0", "lib/lib.jar");
        for (id, path, method) in entries {
            archive.add_detected_license(LicenseId::new(*id), path, *method);
        }
        archive
    }

    #[test]
    fn test_default_copy_single_license() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[("MIT", "LICENSE", DetectionMethod::Pattern)]);
        engine.resolve(&mut archive);
        assert_eq!(archive.resulting_licenses(), archive.detected_licenses());
        assert_eq!(archive.detection_status(), Some(&DetectionStatus::MatchedByPattern));
        assert_eq!(archive.license_text(), Some("MIT text"));
        assert_eq!(archive.documentation_url(), Some("https://opensource.org/licenses/MIT"));
    }

    #[test]
    fn test_global_filter_drops_everything() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[("GPL-2.0-only", "src/test/LICENSE", DetectionMethod::Pattern)]);
        engine.resolve(&mut archive);
        assert!(archive.resulting_licenses().is_empty());
        assert_eq!(archive.detected_licenses().len(), 1);
        assert_eq!(archive.detection_status(), Some(&DetectionStatus::FilteredOut));
    }

    #[test]
    fn test_status_ignores_methods_of_filtered_paths() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[
            ("MIT", "src/test/LICENSE", DetectionMethod::Checksum),
            ("MIT", "LICENSE-MIT", DetectionMethod::FileName),
        ]);
        engine.resolve(&mut archive);
        assert_eq!(archive.resulting_licenses()[&LicenseId::new("MIT")], vec!["LICENSE-MIT"]);
        assert_eq!(archive.detection_status(), Some(&DetectionStatus::MatchedByFileName));
    }

    #[test]
    fn test_conflicting_and_not_detected() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut both = detected(&[
            ("MIT", "LICENSE", DetectionMethod::Pattern),
            ("GPL-2.0-only", "COPYING", DetectionMethod::FileName),
        ]);
        engine.resolve(&mut both);
        assert_eq!(both.detection_status(), Some(&DetectionStatus::ConflictingMatch));
        assert_eq!(both.license_text(), None);

        let mut none = detected(&[]);
        engine.resolve(&mut none);
        assert_eq!(none.detection_status(), Some(&DetectionStatus::NotDetected));
    }

    #[test]
    fn test_override_replaces_wholesale() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::from_toml_str(
            r#"
                [[archive]]
                file_name = "lib.jar"
                licenses = ["MIT"]
                vendor = "Example Org"
                message = "relicensed upstream"
            "#,
            "checked.toml",
            &catalogs,
        )
        .unwrap();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[("GPL-2.0-only", "COPYING", DetectionMethod::Pattern)]);
        engine.resolve(&mut archive);

        let mit = LicenseId::new("MIT");
        assert_eq!(archive.resulting_licenses().len(), 1);
        assert_eq!(archive.file_paths(&mit), &[OVERRIDE_MARKER.to_string()]);
        assert!(archive.detection_status().is_some_and(DetectionStatus::is_overridden));
        assert!(archive.detected_licenses().contains_key(&LicenseId::new("GPL-2.0-only")));
        assert_eq!(archive.vendor(), Some("Example Org"));
        assert_eq!(archive.message(), Some("relicensed upstream"));
    }

    #[test]
    fn test_vendor_filter_flags_without_removing() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[("MIT", "LICENSE", DetectionMethod::Checksum)]).with_vendor("ACME");
        engine.resolve(&mut archive);
        assert!(archive.is_vendor_filtered());
        assert_eq!(archive.detection_status(), Some(&DetectionStatus::MatchedByChecksum));
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let catalogs = catalogs();
        let overrides = CheckedArchiveStore::empty();
        let engine = ResolutionEngine::new(&catalogs, &overrides);

        let mut archive = detected(&[
            ("MIT", "LICENSE", DetectionMethod::Pattern),
            ("MIT", "src/test/LICENSE", DetectionMethod::Pattern),
        ]);
        engine.resolve(&mut archive);
        let first = archive.resulting_licenses().clone();
        engine.resolve(&mut archive);
        assert_eq!(archive.resulting_licenses(), &first);
        assert_eq!(first[&LicenseId::new("MIT")], vec!["LICENSE"]);
    }
}
