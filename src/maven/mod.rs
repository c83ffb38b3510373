//! The Maven domain: coordinates, scopes, raw and resolved POMs, metadata
//! listings, and the downloader that feeds them all from remote
//! repositories through the cache.

mod coordinates;
pub mod downloader;
mod metadata;
mod pom;
pub mod resolver;
mod scope;

pub use coordinates::{Coordinate, Exclusion, GroupArtifact, GroupArtifactRepository, Repository};
pub use downloader::{Fetched, PomDownloader, Transport};
pub use metadata::MavenMetadata;
pub use pom::{RawDependency, RawParent, RawPom};
pub use resolver::{Dependency, PomResolver, ResolvedPom};
pub use scope::Scope;
