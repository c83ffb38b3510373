//! Version selector parsing, ordering, and filtering.
//!
//! A *selector* is the constraint string a recipe is configured with
//! (`1.2.3`, `latest.release`, `2.X`, `[1.0,2.0)`, `~1.2.3`, `^1.2.3`).
//! [`Semver::validate`] turns a selector into a [`VersionComparator`]:
//! a total order over version strings plus a validity predicate that
//! filters candidates before ordering. Validation happens at recipe
//! construction time, so a bad selector fails the recipe before any tree
//! is visited.
//!
//! Maven version strings are not strict semver (`2.3.0.RELEASE`,
//! `3.0.0-M1`, `1.0-rc-2` all occur in the wild), so ordering is defined
//! over parsed numeric parts with a qualifier tie-break rather than
//! delegating to a semver implementation:
//!
//! - numeric segments compare numerically, missing segments count as zero;
//! - a pre-release qualifier sorts before the release with the same
//!   numerics (`RELEASE`, `FINAL`, and `GA` qualifiers count as releases);
//! - two identical releases compare on `+build` metadata only when both
//!   carry it.
//!
//! An optional [`MetadataPattern`] regex further restricts candidates by
//! their qualifier suffix (e.g. `-jre` builds of Guava).

mod comparators;
mod latest;

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{RegraftError, Result};

pub use comparators::{CaretRange, ExactVersion, SetRange, TildeRange, XRange};
pub use latest::{LatestPatch, LatestRelease};

/// A total order over version strings satisfying one selector.
pub trait VersionComparator: Send + Sync {
    /// Whether `candidate` satisfies the selector. Comparators that are
    /// relative to the version currently in use (`latest.patch`) read it
    /// from `current`; the rest ignore it.
    fn is_valid(&self, current: Option<&str>, candidate: &str) -> bool;

    /// Order two version strings. Total over all inputs; unparseable
    /// versions fall back to lexicographic order.
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// The greatest valid candidate strictly newer than `current`, if any.
    fn upgrade<'a>(&self, current: &str, available: &'a [String]) -> Option<&'a str> {
        available
            .iter()
            .filter(|candidate| self.is_valid(Some(current), candidate))
            .filter(|candidate| self.compare(current, candidate) == Ordering::Less)
            .max_by(|a, b| self.compare(a, b))
            .map(String::as_str)
    }
}

impl fmt::Debug for dyn VersionComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionComparator").finish()
    }
}

/// Selector entry point: parse a selector plus optional metadata pattern
/// into a comparator.
pub struct Semver;

impl Semver {
    pub fn validate(
        selector: &str,
        metadata_pattern: Option<&str>,
    ) -> Result<Box<dyn VersionComparator>> {
        let pattern = metadata_pattern
            .map(|raw| MetadataPattern::new(selector, raw))
            .transpose()?;
        let trimmed = selector.trim();

        if trimmed == "latest.release" {
            return Ok(Box::new(LatestRelease::new(pattern)));
        }
        if trimmed == "latest.patch" {
            return Ok(Box::new(LatestPatch::new(pattern)));
        }
        if let Some(rest) = trimmed.strip_prefix('~') {
            return Ok(Box::new(TildeRange::build(trimmed, rest, pattern)?));
        }
        if let Some(rest) = trimmed.strip_prefix('^') {
            return Ok(Box::new(CaretRange::build(trimmed, rest, pattern)?));
        }
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return Ok(Box::new(SetRange::build(trimmed, pattern)?));
        }
        if XRange::looks_like(trimmed) {
            return Ok(Box::new(XRange::build(trimmed, pattern)?));
        }
        if let Some(parts) = VersionParts::parse(trimmed) {
            return Ok(Box::new(ExactVersion::new(parts)));
        }

        Err(RegraftError::InvalidVersionSelector {
            selector: selector.to_string(),
            reason: "not an exact version, wildcard, interval, tilde, caret, \
                     latest.release, or latest.patch selector"
                .to_string(),
        })
    }
}

/// A regex filter over the qualifier suffix of candidate versions,
/// applied before ordering. The suffix includes its leading separator
/// (`-jre` for `29.0-jre`); a version with no qualifier is matched
/// against the empty string.
#[derive(Debug, Clone)]
pub struct MetadataPattern {
    regex: Regex,
}

impl MetadataPattern {
    fn new(selector: &str, pattern: &str) -> Result<MetadataPattern> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|err| RegraftError::InvalidVersionSelector {
            selector: selector.to_string(),
            reason: format!("invalid metadata pattern '{pattern}': {err}"),
        })?;
        Ok(MetadataPattern { regex })
    }

    pub fn matches(&self, suffix: &str) -> bool {
        self.regex.is_match(suffix)
    }
}

/// A version string decomposed for ordering: up to four numeric segments,
/// an optional qualifier, and optional `+build` metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VersionParts {
    pub(crate) nums: Vec<u64>,
    pub(crate) qualifier: Option<String>,
    /// The raw text after the numeric head, separator included, build
    /// metadata excluded. What [`MetadataPattern`] matches against.
    pub(crate) suffix: String,
    pub(crate) build: Option<String>,
}

static RELEASE_QUALIFIERS: &[&str] = &["release", "final", "ga"];

impl VersionParts {
    pub(crate) fn parse(version: &str) -> Option<VersionParts> {
        let version = version.trim();
        let (head, build) = match version.split_once('+') {
            Some((head, build)) => (head, Some(build.to_string())),
            None => (version, None),
        };

        let mut nums = Vec::new();
        let mut qualifier = None;
        let mut suffix = String::new();
        let mut rest = head;
        loop {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return None;
            }
            nums.push(rest[..digits_end].parse().ok()?);
            rest = &rest[digits_end..];
            let mut chars = rest.chars();
            match chars.next() {
                None => break,
                Some('.')
                    if nums.len() < 4
                        && chars.clone().next().is_some_and(|c| c.is_ascii_digit()) =>
                {
                    rest = chars.as_str();
                }
                Some(sep @ ('.' | '-' | '_')) => {
                    let tail = chars.as_str();
                    if tail.is_empty() {
                        return None;
                    }
                    qualifier = Some(tail.to_string());
                    suffix = format!("{sep}{tail}");
                    break;
                }
                Some(_) => return None,
            }
        }

        Some(VersionParts {
            nums,
            qualifier,
            suffix,
            build,
        })
    }

    /// Whether this is a release (no qualifier, or a qualifier like
    /// `RELEASE` that still denotes one).
    pub(crate) fn is_release(&self) -> bool {
        match &self.qualifier {
            None => true,
            Some(q) => RELEASE_QUALIFIERS.contains(&q.to_ascii_lowercase().as_str()),
        }
    }

    pub(crate) fn num(&self, index: usize) -> u64 {
        self.nums.get(index).copied().unwrap_or(0)
    }

    /// Compare only the numeric segments, missing segments counting as 0.
    pub(crate) fn compare_nums(&self, other: &VersionParts) -> Ordering {
        let len = self.nums.len().max(other.nums.len());
        for i in 0..len {
            match self.num(i).cmp(&other.num(i)) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }
}

static LENIENT_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d").expect("literal regex"));

/// The shared ordering every comparator uses.
pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    match (VersionParts::parse(a), VersionParts::parse(b)) {
        (Some(pa), Some(pb)) => {
            let by_nums = pa.compare_nums(&pb);
            if by_nums != Ordering::Equal {
                return by_nums;
            }
            match (pa.is_release(), pb.is_release()) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => pa.qualifier.cmp(&pb.qualifier),
                (true, true) => match (&pa.build, &pb.build) {
                    (Some(ba), Some(bb)) => ba.cmp(bb),
                    _ => Ordering::Equal,
                },
            }
        }
        // Keep totality for junk input: anything that at least starts with
        // a digit outranks anything that does not, then lexicographic.
        (Some(_), None) if !LENIENT_HEAD.is_match(b) => Ordering::Greater,
        (None, Some(_)) if !LENIENT_HEAD.is_match(a) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// Default candidate filter: with a metadata pattern the suffix must match
/// it; without one, only releases are eligible.
pub(crate) fn candidate_ok(parts: &VersionParts, pattern: Option<&MetadataPattern>) -> bool {
    match pattern {
        Some(pattern) => pattern.matches(&parts.suffix),
        None => parts.is_release(),
    }
}
