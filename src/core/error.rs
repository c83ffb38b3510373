//! Error handling for regraft.
//!
//! The error system is built around a single strongly-typed enum,
//! [`RegraftError`], with one variant per failure mode. Variants carry the
//! coordinate or resource identifier they concern so callers can report
//! failures without re-deriving context.
//!
//! Two families of outcomes are deliberately *not* errors:
//!
//! - A definitive "the upstream does not have it" answer (an HTTP 404, a
//!   missing metadata listing) is a [`CacheResult::Unavailable`] value, and
//!   is cached.
//! - A negative *event* (transport failure, malformed XML, serialization
//!   failure) is an error, and is never cached.
//!
//! [`CacheResult::Unavailable`]: crate::cache::CacheResult::Unavailable

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, RegraftError>;

/// All failure modes of the resolution and caching core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RegraftError {
    /// A coordinate string did not have `groupId:artifactId:version` arity.
    #[error("malformed coordinate '{coordinate}': expected groupId:artifactId:version")]
    MalformedCoordinate {
        /// The offending input.
        coordinate: String,
    },

    /// A version selector failed to parse at recipe construction time.
    #[error("invalid version selector '{selector}': {reason}")]
    InvalidVersionSelector {
        /// The selector as written.
        selector: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Every candidate repository answered `Unavailable` for a POM.
    #[error("POM not found in any repository: {coordinate}")]
    PomNotFound {
        /// The coordinate that could not be resolved.
        coordinate: String,
    },

    /// Every candidate repository answered `Unavailable` for a metadata
    /// listing.
    #[error("metadata not found in any repository: {group_artifact}")]
    MetadataNotFound {
        /// The `groupId:artifactId` pair that has no listing.
        group_artifact: String,
    },

    /// A dependency version was still a placeholder or missing after
    /// interpolation and dependency management were applied.
    #[error("unresolved version '{version}' for {coordinate}")]
    UnresolvedVersion {
        /// The dependency whose version could not be made concrete.
        coordinate: String,
        /// What the version looked like after interpolation.
        version: String,
    },

    /// A property placeholder survived the bounded interpolation fixpoint.
    #[error("unresolvable property placeholder '{placeholder}' in {coordinate}")]
    UnresolvedProperty {
        /// The placeholder, including the `${...}` wrapper.
        placeholder: String,
        /// The POM in which it appears.
        coordinate: String,
    },

    /// The parent chain revisited a coordinate or exceeded the depth bound.
    #[error("cycle detected in parent chain: {chain}")]
    CycleDetected {
        /// The chain rendered as `a -> b -> a`.
        chain: String,
    },

    /// The persistent cache workspace is locked by another process.
    #[error("cache workspace is locked: {path}")]
    CacheLocked {
        /// The workspace path that could not be locked.
        path: String,
    },

    /// The transport failed while fetching a resource. Never cached; the
    /// caller may retry.
    #[error("transport failure fetching {url}: {reason}")]
    TransportFailure {
        /// The URL being fetched.
        url: String,
        /// Transport-reported reason.
        reason: String,
    },

    /// The execution context was cancelled before or during an operation.
    #[error("operation cancelled")]
    Cancelled,

    /// XML that could not be parsed into a POM or metadata document.
    #[error("malformed XML in {resource}: {reason}")]
    XmlParse {
        /// Which document failed (URL or description).
        resource: String,
        /// Parser-reported reason.
        reason: String,
    },

    /// A value failed to round-trip through the persistent cache serializer.
    #[error("serialization failure: {reason}")]
    Serialization {
        /// Serializer-reported reason.
        reason: String,
    },

    /// The persistent key/value store failed an operation.
    #[error("cache store failure: {reason}")]
    CacheStorage {
        /// Store-reported reason.
        reason: String,
    },

    /// The follow-up visitor queue kept growing; some visitor reschedules
    /// itself without reaching a fixpoint.
    #[error("follow-up visitor queue exceeded {limit} scheduled visitors")]
    VisitorLoop {
        /// The configured bound that was exceeded.
        limit: usize,
    },

    /// A recipe failed validation or could not be constructed.
    #[error("invalid recipe '{name}': {reason}")]
    InvalidRecipe {
        /// The recipe's fully qualified name.
        name: String,
        /// Validation problems, joined.
        reason: String,
    },

    /// An I/O failure outside the transport (artifact files, lock files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RegraftError {
    fn from(err: serde_json::Error) -> Self {
        RegraftError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RegraftError {
    fn from(err: serde_yaml::Error) -> Self {
        RegraftError::Serialization {
            reason: err.to_string(),
        }
    }
}
