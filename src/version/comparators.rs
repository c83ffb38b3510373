//! Selector-shaped comparators: exact, wildcard, tilde, caret, interval.

use std::cmp::Ordering;

use crate::core::{RegraftError, Result};
use crate::version::{candidate_ok, compare_versions, MetadataPattern, VersionComparator, VersionParts};

fn invalid(selector: &str, reason: impl Into<String>) -> RegraftError {
    RegraftError::InvalidVersionSelector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

/// `1.2.3`: a single version, compared on parsed parts so `1.2` and
/// `1.2.0` are the same selector.
pub struct ExactVersion {
    parts: VersionParts,
}

impl ExactVersion {
    pub(crate) fn new(parts: VersionParts) -> Self {
        Self { parts }
    }
}

impl VersionComparator for ExactVersion {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        VersionParts::parse(candidate).is_some_and(|parts| {
            parts.compare_nums(&self.parts) == Ordering::Equal
                && parts.qualifier == self.parts.qualifier
        })
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

/// `1.X` / `1.2.X`: fixed leading segments, wildcard tail. Wildcards are
/// only accepted in trailing positions; `X`, `x`, and `*` are equivalent.
pub struct XRange {
    fixed: Vec<u64>,
    pattern: Option<MetadataPattern>,
}

impl XRange {
    /// Cheap shape test used by the selector dispatcher.
    pub(crate) fn looks_like(selector: &str) -> bool {
        selector
            .split('.')
            .any(|segment| matches!(segment, "X" | "x" | "*"))
    }

    pub(crate) fn build(selector: &str, pattern: Option<MetadataPattern>) -> Result<XRange> {
        let mut fixed = Vec::new();
        let mut wildcard_seen = false;
        for segment in selector.split('.') {
            match segment {
                "X" | "x" | "*" => wildcard_seen = true,
                _ if wildcard_seen => {
                    return Err(invalid(selector, "wildcard segments must be trailing"));
                }
                _ => {
                    let num = segment
                        .parse::<u64>()
                        .map_err(|_| invalid(selector, format!("bad segment '{segment}'")))?;
                    fixed.push(num);
                }
            }
        }
        if !wildcard_seen || fixed.is_empty() {
            return Err(invalid(selector, "expected a form like 1.X or 1.2.X"));
        }
        Ok(XRange { fixed, pattern })
    }
}

impl VersionComparator for XRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let Some(parts) = VersionParts::parse(candidate) else {
            return false;
        };
        self.fixed
            .iter()
            .enumerate()
            .all(|(i, expected)| parts.num(i) == *expected)
            && candidate_ok(&parts, self.pattern.as_ref())
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

/// Numeric bound used by the tilde, caret, and interval ranges.
#[derive(Debug, Clone)]
struct Bound {
    nums: Vec<u64>,
    inclusive: bool,
}

impl Bound {
    fn admits_lower(&self, parts: &VersionParts) -> bool {
        match compare_nums_to(parts, &self.nums) {
            Ordering::Greater => true,
            Ordering::Equal => self.inclusive,
            Ordering::Less => false,
        }
    }

    fn admits_upper(&self, parts: &VersionParts) -> bool {
        match compare_nums_to(parts, &self.nums) {
            Ordering::Less => true,
            Ordering::Equal => self.inclusive,
            Ordering::Greater => false,
        }
    }
}

fn compare_nums_to(parts: &VersionParts, nums: &[u64]) -> Ordering {
    let len = parts.nums.len().max(nums.len());
    for i in 0..len {
        let theirs = nums.get(i).copied().unwrap_or(0);
        match parts.num(i).cmp(&theirs) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn numeric_parts(selector: &str, text: &str) -> Result<Vec<u64>> {
    let parts = VersionParts::parse(text)
        .ok_or_else(|| invalid(selector, format!("'{text}' is not a version")))?;
    if parts.qualifier.is_some() {
        return Err(invalid(selector, "qualifiers are not allowed in range bounds"));
    }
    Ok(parts.nums)
}

/// `~1.2.3`: at least the given version, below the next minor
/// (`~1` admits the whole major).
pub struct TildeRange {
    lower: Bound,
    upper: Bound,
    pattern: Option<MetadataPattern>,
}

impl TildeRange {
    pub(crate) fn build(
        selector: &str,
        rest: &str,
        pattern: Option<MetadataPattern>,
    ) -> Result<TildeRange> {
        let nums = numeric_parts(selector, rest)?;
        let upper = match nums.len() {
            1 => vec![nums[0] + 1, 0, 0],
            _ => vec![nums[0], nums[1] + 1, 0],
        };
        Ok(TildeRange {
            lower: Bound {
                nums,
                inclusive: true,
            },
            upper: Bound {
                nums: upper,
                inclusive: false,
            },
            pattern,
        })
    }
}

impl VersionComparator for TildeRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let Some(parts) = VersionParts::parse(candidate) else {
            return false;
        };
        self.lower.admits_lower(&parts)
            && self.upper.admits_upper(&parts)
            && candidate_ok(&parts, self.pattern.as_ref())
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

/// `^1.2.3`: compatible-with. Admits versions up to the next major, or the next nonzero
/// segment when the major (and minor) are zero.
pub struct CaretRange {
    lower: Bound,
    upper: Bound,
    pattern: Option<MetadataPattern>,
}

impl CaretRange {
    pub(crate) fn build(
        selector: &str,
        rest: &str,
        pattern: Option<MetadataPattern>,
    ) -> Result<CaretRange> {
        let nums = numeric_parts(selector, rest)?;
        let major = nums.first().copied().unwrap_or(0);
        let minor = nums.get(1).copied().unwrap_or(0);
        let patch = nums.get(2).copied().unwrap_or(0);
        let upper = if major > 0 {
            vec![major + 1, 0, 0]
        } else if minor > 0 {
            vec![0, minor + 1, 0]
        } else if nums.len() >= 3 {
            vec![0, 0, patch + 1]
        } else {
            // ^0 / ^0.0 admit the whole zero-minor range.
            vec![0, minor + 1, 0]
        };
        Ok(CaretRange {
            lower: Bound {
                nums,
                inclusive: true,
            },
            upper: Bound {
                nums: upper,
                inclusive: false,
            },
            pattern,
        })
    }
}

impl VersionComparator for CaretRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let Some(parts) = VersionParts::parse(candidate) else {
            return false;
        };
        self.lower.admits_lower(&parts)
            && self.upper.admits_upper(&parts)
            && candidate_ok(&parts, self.pattern.as_ref())
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }
}

/// `[1.0,2.0)` and friends: an interval with inclusive (`[`, `]`) or
/// exclusive (`(`, `)`) bounds; an omitted bound is unbounded.
pub struct SetRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
    pattern: Option<MetadataPattern>,
}

impl SetRange {
    pub(crate) fn build(selector: &str, pattern: Option<MetadataPattern>) -> Result<SetRange> {
        let mut chars = selector.chars();
        let open = chars.next().ok_or_else(|| invalid(selector, "empty"))?;
        let close = selector
            .chars()
            .last()
            .filter(|c| matches!(c, ']' | ')'))
            .ok_or_else(|| invalid(selector, "expected closing ] or )"))?;
        let inner = &selector[1..selector.len() - 1];
        let (lower_text, upper_text) = inner
            .split_once(',')
            .ok_or_else(|| invalid(selector, "expected two comma-separated bounds"))?;

        let bound = |text: &str, inclusive: bool| -> Result<Option<Bound>> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            Ok(Some(Bound {
                nums: numeric_parts(selector, text)?,
                inclusive,
            }))
        };

        Ok(SetRange {
            lower: bound(lower_text, open == '[')?,
            upper: bound(upper_text, close == ']')?,
            pattern,
        })
    }
}

impl VersionComparator for SetRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let Some(parts) = VersionParts::parse(candidate) else {
            return false;
        };
        self.lower
            .as_ref()
            .is_none_or(|bound| bound.admits_lower(&parts))
            && self
                .upper
                .as_ref()
                .is_none_or(|bound| bound.admits_upper(&parts))
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
    fn exact_matches_equivalent_renderings() {
        let comparator = Semver::validate("1.2", None).unwrap();
        assert!(comparator.is_valid(None, "1.2"));
        assert!(comparator.is_valid(None, "1.2.0"));
        assert!(!comparator.is_valid(None, "1.2.1"));
        assert!(!comparator.is_valid(None, "1.2.0-RC1"));
    }

    #[test]
    fn xrange_fixes_leading_segments() {
        let comparator = Semver::validate("2.X", None).unwrap();
        assert!(comparator.is_valid(None, "2.0"));
        assert!(comparator.is_valid(None, "2.9.4"));
        assert!(!comparator.is_valid(None, "3.0.0"));
        assert!(!comparator.is_valid(None, "2.5.0-M1"));

        let comparator = Semver::validate("2.3.X", None).unwrap();
        assert!(comparator.is_valid(None, "2.3.7"));
        assert!(!comparator.is_valid(None, "2.4.0"));
    }

    #[test]
    fn xrange_rejects_leading_wildcard() {
        assert!(XRange::build("X.2", None).is_err());
        assert!(XRange::build("1.X.2", None).is_err());
    }

    #[test]
    fn tilde_bounds() {
        let comparator = Semver::validate("~1.2.3", None).unwrap();
        assert!(!comparator.is_valid(None, "1.2.2"));
        assert!(comparator.is_valid(None, "1.2.3"));
        assert!(comparator.is_valid(None, "1.2.9"));
        assert!(!comparator.is_valid(None, "1.3.0"));

        let comparator = Semver::validate("~1", None).unwrap();
        assert!(comparator.is_valid(None, "1.9.9"));
        assert!(!comparator.is_valid(None, "2.0.0"));
    }

    #[test]
    fn caret_bounds() {
        let comparator = Semver::validate("^1.2.3", None).unwrap();
        assert!(comparator.is_valid(None, "1.2.3"));
        assert!(comparator.is_valid(None, "1.9.0"));
        assert!(!comparator.is_valid(None, "2.0.0"));
        assert!(!comparator.is_valid(None, "1.2.2"));

        let comparator = Semver::validate("^0.2.3", None).unwrap();
        assert!(comparator.is_valid(None, "0.2.9"));
        assert!(!comparator.is_valid(None, "0.3.0"));

        let comparator = Semver::validate("^0.0.3", None).unwrap();
        assert!(comparator.is_valid(None, "0.0.3"));
        assert!(!comparator.is_valid(None, "0.0.4"));
    }

    #[test]
    fn interval_bounds() {
        let comparator = Semver::validate("[1.0,2.0)", None).unwrap();
        assert!(comparator.is_valid(None, "1.0"));
        assert!(comparator.is_valid(None, "1.9.9"));
        assert!(!comparator.is_valid(None, "2.0"));

        let comparator = Semver::validate("(1.0,2.0]", None).unwrap();
        assert!(!comparator.is_valid(None, "1.0"));
        assert!(comparator.is_valid(None, "2.0"));

        let comparator = Semver::validate("[1.5,)", None).unwrap();
        assert!(comparator.is_valid(None, "99.0"));
        assert!(!comparator.is_valid(None, "1.4"));

        let comparator = Semver::validate("(,2.0]", None).unwrap();
        assert!(comparator.is_valid(None, "0.1"));
        assert!(!comparator.is_valid(None, "2.1"));
    }

    #[test]
    fn ranges_exclude_prereleases_by_default() {
        let comparator = Semver::validate("[1.0,3.0]", None).unwrap();
        assert!(!comparator.is_valid(None, "2.0.0-M1"));
        assert!(comparator.is_valid(None, "2.0.0.RELEASE"));
    }
}
