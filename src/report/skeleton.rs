//! Checked-archive skeleton
//!
//! Renders every archive as an `[[archive]]` entry in the override file
//! format, pre-filled with what the pipeline concluded. Curators fill in
//! the message and copy the entries they verified.

use crate::archive::Archive;
use crate::catalog::overrides::{CheckedArchiveEntry, CheckedArchiveFile};
use crate::ScoutResult;

/// One entry per archive, keyed by digest when one is known
pub fn entry_for(archive: &Archive) -> CheckedArchiveEntry {
    let digest = archive.message_digest_string();
    CheckedArchiveEntry {
        file_name: archive.file_name().to_string(),
        version: archive.version().to_string(),
        digest: (!digest.is_empty()).then_some(digest),
        licenses: archive
            .resulting_licenses()
            .keys()
            .map(|id| id.as_str().to_string())
            .collect(),
        legal_status: None,
        message: String::new(),
        vendor: archive.vendor().map(str::to_string),
        provider: archive.provider().map(|p| p.id.clone()),
        notice: archive.notice().map(|n| n.id.clone()),
        documentation_url: archive.documentation_url().map(str::to_string),
    }
}

pub fn render(archives: &[Archive]) -> ScoutResult<String> {
    let file = CheckedArchiveFile {
        archive: archives.iter().map(entry_for).collect(),
    };
    Ok(toml::to_string(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveType, MessageDigest};
    use crate::license::{DetectionMethod, LicenseId};

    #[test]
    fn test_skeleton_entries() {
        let mut archive = Archive::new(ArchiveType::Java, "commons-io.jar", "2.11.0", "lib/commons-io.jar")
            .with_digest(MessageDigest::sha256(b"jar"));
        archive.add_detected_license(LicenseId::new("Apache-2.0"), "LICENSE", DetectionMethod::Pattern);
        archive.replace_resulting_licenses(archive.detected_licenses().clone());
        let bare = Archive::new(ArchiveType::Javascript, "left-pad", "1.3.0", "node_modules/left-pad");

        let rendered = render(&[archive, bare]).unwrap();
        assert_eq!(rendered.matches("[[archive]]").count(), 2);
        assert!(rendered.contains("file_name = \"commons-io.jar\""));
        assert!(rendered.contains("licenses = [\"Apache-2.0\"]"));
        assert!(rendered.contains(&MessageDigest::sha256(b"jar").to_hex()));

        let parsed: CheckedArchiveFile = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.archive[1].digest, None);
        assert!(parsed.archive[1].licenses.is_empty());
    }
}
