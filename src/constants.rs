//! Crate-wide constants.
//!
//! Bounds and defaults that several modules share. Defining them centrally
//! keeps the resolution limits auditable at a glance.

use std::time::Duration;

/// Maximum depth of a POM parent chain before resolution is rejected.
pub const MAX_PARENT_DEPTH: usize = 16;

/// Maximum number of substitution passes when interpolating `${...}`
/// placeholders in POM properties.
pub const MAX_INTERPOLATION_PASSES: usize = 10;

/// Maximum number of times a recipe's visitor is re-applied while driving the
/// tree to a fixpoint.
pub const MAX_RECIPE_CYCLES: usize = 3;

/// Maximum number of follow-up visitors drained in one fixpoint cycle.
/// Exceeding this indicates a visitor that keeps rescheduling itself.
pub const MAX_SCHEDULED_VISITORS: usize = 64;

/// How long to wait for the persistent cache's exclusive file lock before
/// failing with [`RegraftError::CacheLocked`](crate::core::RegraftError::CacheLocked).
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);

/// The implicit terminal repository consulted after all caller-supplied
/// repositories.
pub const MAVEN_CENTRAL_URI: &str = "https://repo.maven.apache.org/maven2";

/// Repository id used for the implicit Maven Central entry.
pub const MAVEN_CENTRAL_ID: &str = "central";
