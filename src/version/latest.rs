//! Comparators relative to the release stream rather than a fixed range.

use std::cmp::Ordering;

use crate::version::{candidate_ok, compare_versions, MetadataPattern, VersionComparator, VersionParts};

/// `latest.release`: any non-snapshot, non-pre-release version (or, with a
/// metadata pattern, any version whose qualifier matches it).
pub struct LatestRelease {
    pattern: Option<MetadataPattern>,
}

impl LatestRelease {
    pub(crate) fn new(pattern: Option<MetadataPattern>) -> Self {
        Self { pattern }
    }
}

impl VersionComparator for LatestRelease {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        VersionParts::parse(candidate)
            .is_some_and(|parts| candidate_ok(&parts, self.pattern.as_ref()))
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

/// `latest.patch`: the greatest patch for the current version's
/// major.minor line. Requires a current version; with none supplied no
/// candidate is valid.
pub struct LatestPatch {
    pattern: Option<MetadataPattern>,
}

impl LatestPatch {
    pub(crate) fn new(pattern: Option<MetadataPattern>) -> Self {
        Self { pattern }
    }
}

impl VersionComparator for LatestPatch {
    fn is_valid(&self, current: Option<&str>, candidate: &str) -> bool {
        let Some(current) = current.and_then(VersionParts::parse) else {
            return false;
        };
        let Some(parts) = VersionParts::parse(candidate) else {
            return false;
        };
        parts.num(0) == current.num(0)
            && parts.num(1) == current.num(1)
            && parts.compare_nums(&current) != Ordering::Less
            && candidate_ok(&parts, self.pattern.as_ref())
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Semver;

    #[test]
    fn latest_release_excludes_prereleases() {
        let comparator = Semver::validate("latest.release", None).unwrap();
        assert!(comparator.is_valid(None, "2.4.0"));
        assert!(comparator.is_valid(None, "2.3.0.RELEASE"));
        assert!(!comparator.is_valid(None, "3.0.0-M1"));
        assert!(!comparator.is_valid(None, "1.0-SNAPSHOT"));
        assert!(!comparator.is_valid(None, "main"));
    }

    #[test]
    fn latest_patch_stays_on_the_minor_line() {
        let comparator = Semver::validate("latest.patch", None).unwrap();
        assert!(comparator.is_valid(Some("1.2.3"), "1.2.4"));
        assert!(comparator.is_valid(Some("1.2.3"), "1.2.3"));
        assert!(!comparator.is_valid(Some("1.2.3"), "1.2.2"));
        assert!(!comparator.is_valid(Some("1.2.3"), "1.3.0"));
        assert!(!comparator.is_valid(None, "1.2.4"));
    }

    #[test]
    fn latest_patch_upgrade() {
        let comparator = Semver::validate("latest.patch", None).unwrap();
        let available = vec![
            "1.2.2".to_string(),
            "1.2.4".to_string(),
            "1.2.9".to_string(),
            "1.3.0".to_string(),
        ];
        assert_eq!(comparator.upgrade("1.2.3", &available), Some("1.2.9"));
    }

    #[test]
    fn latest_release_picks_max_across_minors() {
        let comparator = Semver::validate("latest.release", None).unwrap();
        let available = vec![
            "2.3.0".to_string(),
            "2.4.0".to_string(),
            "3.0.0-M1".to_string(),
        ];
        assert_eq!(comparator.upgrade("2.3.0", &available), Some("2.4.0"));
    }
}
