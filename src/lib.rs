//! regraft - Maven dependency resolution and caching for recipe-driven
//! manifest rewriting.
//!
//! regraft is the resolution core of a refactoring framework: it ingests
//! Maven POM manifests, builds a fully resolved dependency graph, and
//! exposes that graph to *recipes*: named, validated transformation units
//! that rewrite manifest tags (for example, upgrading a parent coordinate
//! to the latest matching version).
//!
//! # Architecture Overview
//!
//! Resolution is read-side only: the crate's side effects are downloads
//! through a caller-supplied [`Transport`](maven::Transport) and writes
//! into a caller-supplied [`PomCache`](cache::PomCache). There is no
//! internal thread pool; everything blocks on the calling thread, and the
//! caches are safe to share across threads when the driver resolves
//! independent root POMs concurrently.
//!
//! Data flows in one direction:
//!
//! 1. A recipe visits a manifest tag and asks the
//!    [`PomDownloader`](maven::PomDownloader) for a coordinate.
//! 2. The downloader consults the cache; on a miss it runs a producer
//!    against the transport and records the answer, including the
//!    *negative* answer that the upstream definitively lacks the resource.
//! 3. The [`PomResolver`](maven::PomResolver) expands parents, interpolates
//!    properties, folds dependency management (BOM imports included), and
//!    produces a resolved dependency tree with exclusions and the Maven
//!    scope-transitivity table applied at every edge.
//! 4. The visitor compares versions through a
//!    [`VersionComparator`](version::VersionComparator) and schedules a
//!    follow-up visitor to rewrite the tag.
//!
//! # Core Modules
//!
//! - [`cache`] - the layered [`PomCache`](cache::PomCache) (in-memory,
//!   persistent, composed) plus the on-disk artifact cache
//! - [`maven`] - coordinates, scopes, raw/resolved POMs, metadata, and the
//!   downloader
//! - [`version`] - version selector parsing and candidate ordering
//! - [`recipe`] - recipes, tree visitors, and declarative composition
//! - [`recipes`] - built-in recipes such as
//!   [`UpgradeParentVersion`](recipes::UpgradeParentVersion)
//! - [`config`] - the [`Environment`](config::Environment) aggregating
//!   recipe and style sources
//! - [`xml`] - the minimal manifest tag tree recipes rewrite
//! - [`core`] - errors and the execution context
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use regraft::cache::InMemoryPomCache;
//! use regraft::config::Environment;
//! use regraft::core::ExecutionContext;
//! use regraft::maven::{Fetched, PomDownloader, Transport};
//! use regraft::recipe::run_recipe;
//! use regraft::recipes;
//! use regraft::xml::Tag;
//!
//! struct Http;
//!
//! impl Transport for Http {
//!     fn get(&self, url: &str) -> regraft::core::Result<Fetched> {
//!         // bring your own HTTP client
//!         # let _ = url;
//!         Ok(Fetched::NotFound)
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let downloader = Arc::new(PomDownloader::new(
//!         Arc::new(InMemoryPomCache::new()),
//!         Arc::new(Http),
//!     ));
//!     let env = Environment::builder()
//!         .with_registry(recipes::builtin_registry(Arc::clone(&downloader)))
//!         .load_yaml(
//!             r#"
//! type: specs.openrewrite.org/v1beta/recipe
//! name: com.example.UpgradeSpringBoot
//! recipeList:
//!   - regraft.maven.UpgradeParentVersion:
//!       groupId: org.springframework.boot
//!       artifactId: spring-boot-starter-parent
//!       newVersion: 2.X
//! "#,
//!             "rewrite.yml",
//!         )?
//!         .build();
//!
//!     let root = env.activate_recipes(["com.example.UpgradeSpringBoot"]);
//!     let pom = Tag::parse(&std::fs::read_to_string("pom.xml")?, "pom.xml")?;
//!     let ctx = ExecutionContext::new();
//!     let rewritten = run_recipe(&root, &pom, &ctx)?;
//!     print!("{}", rewritten.render());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod core;
pub mod maven;
pub mod recipe;
pub mod recipes;
pub mod version;
pub mod xml;

pub use crate::core::{ExecutionContext, RegraftError, Result};
