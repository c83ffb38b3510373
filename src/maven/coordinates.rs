//! Coordinate primitives: group/artifact pairs, full coordinates,
//! exclusions, and repository descriptors.
//!
//! These are plain value types with structural equality and a stable
//! `g:a:v` rendering. All behavior beyond parsing and formatting lives in
//! the downloader and resolver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{RegraftError, Result};

/// Identity of an artifact independent of version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupArtifact {
    pub group_id: String,
    pub artifact_id: String,
}

impl GroupArtifact {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for GroupArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A full `groupId:artifactId:version` coordinate.
///
/// The version may be a literal, a `${...}` placeholder awaiting
/// interpolation, or a range expression such as `[1.0,2.0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_artifact: GroupArtifact,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_artifact: GroupArtifact::new(group_id, artifact_id),
            version: version.into(),
        }
    }

    /// Parse a `g:a:v` string. Fails with
    /// [`RegraftError::MalformedCoordinate`] on any other arity.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(RegraftError::MalformedCoordinate {
                coordinate: input.to_string(),
            }),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_artifact.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.group_artifact.artifact_id
    }

    /// Whether the version still contains a `${...}` placeholder.
    pub fn has_placeholder(&self) -> bool {
        self.version.contains("${")
    }

    /// Whether the version is an interval range expression.
    pub fn is_range(&self) -> bool {
        self.version.starts_with('[') || self.version.starts_with('(')
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_artifact, self.version)
    }
}

/// A dependency exclusion. Either component may be the wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn matches(&self, ga: &GroupArtifact) -> bool {
        (self.group_id == "*" || self.group_id == ga.group_id)
            && (self.artifact_id == "*" || self.artifact_id == ga.artifact_id)
    }
}

/// A remote repository descriptor.
///
/// Equality is structural over the id, URI, and policy flags, so a
/// normalized repository compares unequal to its raw form. The URI is kept
/// as a string; normalization is the only transformation applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub uri: String,
    pub releases: bool,
    pub snapshots: bool,
}

impl Repository {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            releases: true,
            snapshots: false,
        }
    }

    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_releases(mut self, releases: bool) -> Self {
        self.releases = releases;
        self
    }

    /// Produce the normalized form: `http://` upgraded to `https://` and
    /// trailing slashes stripped. Idempotent.
    pub fn normalize(&self) -> Repository {
        let mut uri = self.uri.trim_end_matches('/').to_string();
        if let Some(rest) = uri.strip_prefix("http://") {
            uri = format!("https://{rest}");
        }
        Repository {
            id: self.id.clone(),
            uri,
            releases: self.releases,
            snapshots: self.snapshots,
        }
    }
}

/// Cache key combining a repository (by URI) with a [`GroupArtifact`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupArtifactRepository {
    pub repository_uri: String,
    pub group_artifact: GroupArtifact,
}

impl GroupArtifactRepository {
    pub fn new(repository: &Repository, group_artifact: GroupArtifact) -> Self {
        Self {
            repository_uri: repository.uri.clone(),
            group_artifact,
        }
    }
}
