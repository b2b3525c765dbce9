//! Signature pattern matching over license text
//!
//! Every distinct pattern of every catalog license goes into a single
//! Aho-Corasick automaton, so a candidate file is scanned once no matter
//! how many licenses the catalog declares.

use crate::license::{License, LicenseId};
use crate::{ScoutError, ScoutResult};
use aho_corasick::AhoCorasick;
use std::collections::HashMap;

/// Collapse whitespace runs to one space and lowercase
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// All-patterns-must-match license text matcher
pub struct PatternMatcher {
    matcher: Option<AhoCorasick>,
    pattern_count: usize,
    /// License id → indices of its distinct patterns in the automaton
    required: Vec<(LicenseId, Vec<usize>)>,
}

impl PatternMatcher {
    pub fn new(licenses: &[License]) -> ScoutResult<Self> {
        let mut patterns: Vec<String> = Vec::new();
        let mut pattern_index: HashMap<String, usize> = HashMap::new();
        let mut required = Vec::new();

        for license in licenses.iter().filter(|l| !l.patterns.is_empty()) {
            let mut ids = Vec::with_capacity(license.patterns.len());
            for raw in &license.patterns {
                let normalized = normalize_text(raw);
                if normalized.is_empty() {
                    return Err(ScoutError::config(
                        "license catalog",
                        format!("license '{}' has an empty pattern", license.id),
                    ));
                }
                let next = patterns.len();
                let idx = *pattern_index.entry(normalized.clone()).or_insert(next);
                if idx == next {
                    patterns.push(normalized);
                }
                if !ids.contains(&idx) {
                    ids.push(idx);
                }
            }
            required.push((license.id.clone(), ids));
        }

        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(&patterns)
                    .map_err(|e| {
                        ScoutError::config("license catalog", format!("pattern matcher: {}", e))
                    })?,
            )
        };

        Ok(Self {
            matcher,
            pattern_count: patterns.len(),
            required,
        })
    }

    /// Licenses whose every pattern occurs in `text`, in catalog order
    pub fn matches(&self, text: &str) -> Vec<LicenseId> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };
        let normalized = normalize_text(text);
        let mut seen = vec![false; self.pattern_count];
        for mat in matcher.find_overlapping_iter(&normalized) {
            seen[mat.pattern().as_usize()] = true;
        }
        self.required
            .iter()
            .filter(|(_, ids)| ids.iter().all(|&i| seen[i]))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn licenses() -> Vec<License> {
        vec![
            License::new("Apache-2.0", "approved")
                .with_patterns(&["Apache License", "Version 2.0, January 2004"]),
            License::new("MIT", "approved").with_patterns(&[
                "Permission is hereby granted, free of charge",
                "THE SOFTWARE IS PROVIDED \"AS IS\"",
            ]),
            License::new("Apache-1.1", "approved")
                .with_patterns(&["Apache License", "Version 1.1"]),
        ]
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Apache\n\tLICENSE   2.0 "), "apache license 2.0");
    }

    #[test]
    fn test_all_patterns_required() {
        let matcher = PatternMatcher::new(&licenses()).unwrap();
        assert_eq!(matcher.pattern_count(), 5);

        let text = "                Apache License\n          Version 2.0,   January 2004\n";
        assert_eq!(matcher.matches(text), vec![LicenseId::new("Apache-2.0")]);

        // One of two MIT patterns only
        let partial = "Permission is hereby granted, free of charge, to any person";
        assert!(matcher.matches(partial).is_empty());
    }

    #[test]
    fn test_multiple_licenses_in_one_file() {
        let matcher = PatternMatcher::new(&licenses()).unwrap();
        let text = "Apache License Version 2.0, January 2004 ... \
                    permission is hereby granted, free of charge ... \
                    the software is provided \"as is\"";
        assert_eq!(
            matcher.matches(text),
            vec![LicenseId::new("Apache-2.0"), LicenseId::new("MIT")]
        );
    }

    #[test]
    fn test_no_patterns_matches_nothing() {
        let matcher = PatternMatcher::new(&[License::new("MIT", "approved")]).unwrap();
        assert!(matcher.matches("anything").is_empty());
    }
}
