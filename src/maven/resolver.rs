//! POM resolution: parent expansion, property interpolation, dependency
//! management, and the resolved dependency tree.
//!
//! [`PomResolver::resolve`] turns a [`RawPom`] into a [`ResolvedPom`] by
//! walking the parent chain (bounded, cycle-checked), merging properties
//! child-over-parent, running `${...}` substitution to a bounded fixpoint,
//! and folding `dependencyManagement`, including import-scope BOMs, which
//! contribute their managed section only. [`PomResolver::resolve_tree`]
//! then expands the resolved dependencies breadth-first into a tree,
//! applying exclusions and the scope-transitivity table at every edge and
//! deduplicating nearest-wins.
//!
//! Resolved POMs are memoized per coordinate for the lifetime of the
//! resolver, which callers scope to one refactoring session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::constants::{MAX_INTERPOLATION_PASSES, MAX_PARENT_DEPTH};
use crate::core::{ExecutionContext, RegraftError, Result};
use crate::maven::downloader::PomDownloader;
use crate::maven::{
    Coordinate, Exclusion, GroupArtifact, RawDependency, RawPom, Repository, Scope,
};
use crate::version::Semver;

/// A manifest after parent merge and interpolation. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPom {
    pub coordinate: Coordinate,
    pub packaging: Option<String>,
    /// Fully interpolated properties, declaration-ordered, parents first.
    pub effective_properties: Vec<(String, String)>,
    /// Merged dependency management, parents first, BOM imports expanded.
    pub effective_managed: Vec<RawDependency>,
    /// Declared dependencies with concrete versions.
    pub effective_dependencies: Vec<RawDependency>,
    /// Own repositories plus ancestors', declaration order.
    pub repositories: Vec<Repository>,
}

/// A node in the resolved dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub coordinate: Coordinate,
    /// The version the declaring POM settled on for this node, before
    /// nearest-wins mediation across the tree.
    pub requested_version: String,
    pub scope: Scope,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
    /// The repository that supplied this dependency's POM, when expanded.
    pub repository: Option<Repository>,
    /// Child dependencies in declaration order.
    pub children: Vec<Dependency>,
}

impl Dependency {
    pub fn group_artifact(&self) -> &GroupArtifact {
        &self.coordinate.group_artifact
    }

    /// Depth-first search over the subtree, self included.
    pub fn find(&self, group_id: &str, artifact_id: &str) -> Option<&Dependency> {
        if self.coordinate.group_id() == group_id && self.coordinate.artifact_id() == artifact_id {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find(group_id, artifact_id))
    }
}

/// Resolves raw POMs against a downloader, memoizing per coordinate.
pub struct PomResolver {
    downloader: Arc<PomDownloader>,
    resolved: DashMap<String, ResolvedPom>,
}

impl PomResolver {
    pub fn new(downloader: Arc<PomDownloader>) -> Self {
        Self {
            downloader,
            resolved: DashMap::new(),
        }
    }

    pub fn downloader(&self) -> &Arc<PomDownloader> {
        &self.downloader
    }

    /// Resolve a raw POM: expand parents, interpolate, merge management.
    pub fn resolve(&self, raw: &RawPom, ctx: &ExecutionContext) -> Result<ResolvedPom> {
        self.resolve_inner(raw, &[], &mut Vec::new(), ctx)
    }

    fn resolve_inner(
        &self,
        raw: &RawPom,
        inherited_repositories: &[Repository],
        chain: &mut Vec<String>,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedPom> {
        let declared = declared_coordinate(raw)?;
        if chain.contains(&declared) || chain.len() >= MAX_PARENT_DEPTH {
            let mut rendered = chain.clone();
            rendered.push(declared);
            return Err(RegraftError::CycleDetected {
                chain: rendered.join(" -> "),
            });
        }
        if let Some(hit) = self.resolved.get(&declared) {
            return Ok(hit.clone());
        }

        let mut repositories: Vec<Repository> = raw.repositories.clone();
        for repo in inherited_repositories {
            if !repositories.contains(repo) {
                repositories.push(repo.clone());
            }
        }

        // Expand the parent first; its properties and managed entries form
        // the base the child overrides.
        let parent = match &raw.parent {
            Some(parent) => {
                let parent_coordinate =
                    Coordinate::new(&parent.group_id, &parent.artifact_id, &parent.version);
                let (parent_raw, _) =
                    self.downloader
                        .download_pom(&parent_coordinate, &repositories, ctx)?;
                chain.push(declared.clone());
                let resolved =
                    self.resolve_inner(&parent_raw, &repositories, chain, ctx);
                chain.pop();
                Some(resolved?)
            }
            None => None,
        };

        if let Some(parent) = &parent {
            for repo in &parent.repositories {
                if !repositories.contains(repo) {
                    repositories.push(repo.clone());
                }
            }
        }

        // Property merge: parent's effective set, overridden by own
        // declarations, plus the implicit project.* values.
        let mut properties: Vec<(String, String)> = parent
            .as_ref()
            .map(|p| p.effective_properties.clone())
            .unwrap_or_default();
        for (name, value) in &raw.properties {
            upsert(&mut properties, name, value.clone());
        }

        let group_id = raw
            .group_id
            .clone()
            .or_else(|| parent.as_ref().map(|p| p.coordinate.group_id().to_string()))
            .or_else(|| raw.parent.as_ref().map(|p| p.group_id.clone()))
            .unwrap_or_default();
        let artifact_id = raw.artifact_id.clone().unwrap_or_default();
        let version = raw
            .version
            .clone()
            .or_else(|| parent.as_ref().map(|p| p.coordinate.version.clone()))
            .or_else(|| raw.parent.as_ref().map(|p| p.version.clone()))
            .unwrap_or_default();

        for (name, value) in [
            ("project.groupId", group_id.as_str()),
            ("pom.groupId", group_id.as_str()),
            ("project.artifactId", artifact_id.as_str()),
            ("pom.artifactId", artifact_id.as_str()),
            ("project.version", version.as_str()),
            ("pom.version", version.as_str()),
        ] {
            upsert(&mut properties, name, value.to_string());
        }
        if let Some(parent) = &parent {
            for (name, value) in [
                ("project.parent.groupId", parent.coordinate.group_id()),
                ("project.parent.artifactId", parent.coordinate.artifact_id()),
                ("project.parent.version", parent.coordinate.version.as_str()),
            ] {
                upsert(&mut properties, name, value.to_string());
            }
        }

        let effective_properties = interpolate_fixpoint(properties, &declared)?;
        let coordinate = Coordinate::new(
            resolve_text(&group_id, &effective_properties, &declared)?,
            resolve_text(&artifact_id, &effective_properties, &declared)?,
            resolve_text(&version, &effective_properties, &declared)?,
        );

        // Managed dependencies: parent entries first, then BOM imports in
        // declaration order, then own entries, later writers winning.
        let mut effective_managed: Vec<RawDependency> = parent
            .as_ref()
            .map(|p| p.effective_managed.clone())
            .unwrap_or_default();
        for entry in &raw.dependency_management {
            let entry = interpolate_dependency(entry, &effective_properties, &declared)?;
            if entry.is_bom_import() {
                let bom_version = match &entry.version {
                    Some(version) => version.clone(),
                    None => {
                        return Err(RegraftError::UnresolvedVersion {
                            coordinate: format!("{}:{}", entry.group_id, entry.artifact_id),
                            version: String::new(),
                        })
                    }
                };
                let bom_coordinate =
                    Coordinate::new(&entry.group_id, &entry.artifact_id, &bom_version);
                debug!(bom = %bom_coordinate, "expanding imported BOM");
                let (bom_raw, _) =
                    self.downloader
                        .download_pom(&bom_coordinate, &repositories, ctx)?;
                chain.push(declared.clone());
                let bom = self.resolve_inner(&bom_raw, &repositories, chain, ctx);
                chain.pop();
                // A BOM contributes its managed section only; its declared
                // dependencies are ignored.
                for managed in bom?.effective_managed {
                    upsert_managed(&mut effective_managed, managed);
                }
            } else {
                upsert_managed(&mut effective_managed, entry);
            }
        }

        // Declared dependencies: interpolate, then settle each version
        // from the declaration, management, or a range against metadata.
        let mut effective_dependencies = Vec::with_capacity(raw.dependencies.len());
        for dep in &raw.dependencies {
            let mut dep = interpolate_dependency(dep, &effective_properties, &declared)?;
            let managed = {
                let key = dep.management_key();
                effective_managed
                    .iter()
                    .find(|entry| entry.management_key() == key)
                    .cloned()
            };

            if dep.version.is_none() {
                dep.version = managed.as_ref().and_then(|entry| entry.version.clone());
            }
            if dep.scope.is_none() {
                dep.scope = managed.as_ref().and_then(|entry| entry.scope.clone());
            }
            if let Some(managed) = &managed {
                for exclusion in &managed.exclusions {
                    if !dep.exclusions.contains(exclusion) {
                        dep.exclusions.push(exclusion.clone());
                    }
                }
            }

            let version = dep.version.clone().unwrap_or_default();
            if version.is_empty() || version.contains("${") {
                return Err(RegraftError::UnresolvedVersion {
                    coordinate: format!("{}:{}", dep.group_id, dep.artifact_id),
                    version,
                });
            }
            if version.starts_with('[') || version.starts_with('(') {
                dep.version =
                    Some(self.pick_from_range(&dep, &version, &repositories, ctx)?);
            }
            effective_dependencies.push(dep);
        }

        let resolved = ResolvedPom {
            coordinate,
            packaging: raw.packaging.clone(),
            effective_properties,
            effective_managed,
            effective_dependencies,
            repositories,
        };
        self.resolved.insert(declared, resolved.clone());
        Ok(resolved)
    }

    /// Pick the greatest metadata version matching an interval range.
    fn pick_from_range(
        &self,
        dep: &RawDependency,
        range: &str,
        repositories: &[Repository],
        ctx: &ExecutionContext,
    ) -> Result<String> {
        let comparator =
            Semver::validate(range, None).map_err(|_| RegraftError::UnresolvedVersion {
                coordinate: format!("{}:{}", dep.group_id, dep.artifact_id),
                version: range.to_string(),
            })?;
        let group_artifact = GroupArtifact::new(&dep.group_id, &dep.artifact_id);
        let metadata = self
            .downloader
            .download_metadata(&group_artifact, repositories, ctx)?;
        metadata
            .versions
            .iter()
            .filter(|candidate| comparator.is_valid(None, candidate))
            .max_by(|a, b| comparator.compare(a, b))
            .cloned()
            .ok_or_else(|| RegraftError::UnresolvedVersion {
                coordinate: group_artifact.to_string(),
                version: range.to_string(),
            })
    }

    /// Expand a resolved POM's dependencies into the full tree.
    ///
    /// Breadth-first so the nearest-wins rule falls out of visit order:
    /// the first time a `(group, artifact, classifier, type)` key appears
    /// it is at its shortest path from the root, with same-depth ties
    /// broken by declaration order.
    pub fn resolve_tree(
        &self,
        root: &ResolvedPom,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Dependency>> {
        struct Node {
            dep: Dependency,
            exclusions: Vec<Exclusion>,
            parent: Option<usize>,
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut seen: HashSet<(String, String, Option<String>, Option<String>)> = HashSet::new();
        let mut frontier: Vec<usize> = Vec::new();

        for dep in &root.effective_dependencies {
            let scope = Scope::from_name(dep.scope.as_deref());
            if scope == Scope::Invalid {
                warn!(
                    dependency = %format!("{}:{}", dep.group_id, dep.artifact_id),
                    declared = dep.scope.as_deref().unwrap_or(""),
                    "skipping dependency with invalid scope"
                );
                continue;
            }
            if !seen.insert(dep.management_key()) {
                continue;
            }
            let node = Node {
                dep: direct_node(dep, scope),
                exclusions: dep.exclusions.clone(),
                parent: None,
            };
            nodes.push(node);
            frontier.push(nodes.len() - 1);
        }

        while !frontier.is_empty() {
            let mut next_frontier = Vec::new();
            for index in frontier {
                let (coordinate, scope, exclusions) = {
                    let node = &nodes[index];
                    (
                        node.dep.coordinate.clone(),
                        node.dep.scope,
                        node.exclusions.clone(),
                    )
                };
                if scope == Scope::System {
                    // System-scope dependencies are leaves; nothing to fetch.
                    continue;
                }

                let (raw, repository) =
                    self.downloader
                        .download_pom(&coordinate, &root.repositories, ctx)?;
                nodes[index].dep.repository = Some(repository);
                let resolved =
                    self.resolve_inner(&raw, &root.repositories, &mut Vec::new(), ctx)?;

                for child in &resolved.effective_dependencies {
                    if child.optional {
                        continue;
                    }
                    let child_ga = GroupArtifact::new(&child.group_id, &child.artifact_id);
                    if exclusions.iter().any(|exclusion| exclusion.matches(&child_ga)) {
                        continue;
                    }
                    let declared_scope = Scope::from_name(child.scope.as_deref());
                    let Some(effective_scope) = declared_scope.transitive_of(scope) else {
                        continue;
                    };
                    if !seen.insert(child.management_key()) {
                        continue;
                    }

                    let mut child_exclusions = exclusions.clone();
                    for exclusion in &child.exclusions {
                        if !child_exclusions.contains(exclusion) {
                            child_exclusions.push(exclusion.clone());
                        }
                    }
                    let node = Node {
                        dep: direct_node(child, effective_scope),
                        exclusions: child_exclusions,
                        parent: Some(index),
                    };
                    nodes.push(node);
                    next_frontier.push(nodes.len() - 1);
                }
            }
            frontier = next_frontier;
        }

        // Reassemble the arena into owned trees, children in insertion
        // (declaration) order.
        let mut children_of: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            match node.parent {
                Some(parent) => children_of.entry(parent).or_default().push(index),
                None => roots.push(index),
            }
        }

        fn assemble(
            index: usize,
            nodes: &[Node],
            children_of: &HashMap<usize, Vec<usize>>,
        ) -> Dependency {
            let mut dep = nodes[index].dep.clone();
            if let Some(children) = children_of.get(&index) {
                dep.children = children
                    .iter()
                    .map(|child| assemble(*child, nodes, children_of))
                    .collect();
            }
            dep
        }

        Ok(roots
            .into_iter()
            .map(|index| assemble(index, &nodes, &children_of))
            .collect())
    }
}

fn direct_node(dep: &RawDependency, scope: Scope) -> Dependency {
    let version = dep.version.clone().unwrap_or_default();
    Dependency {
        coordinate: Coordinate::new(&dep.group_id, &dep.artifact_id, &version),
        requested_version: version,
        scope,
        classifier: dep.classifier.clone(),
        type_: dep.type_.clone(),
        optional: dep.optional,
        exclusions: dep.exclusions.clone(),
        repository: None,
        children: Vec::new(),
    }
}

fn declared_coordinate(raw: &RawPom) -> Result<String> {
    let group = raw.effective_group_id().unwrap_or("");
    let artifact = raw.artifact_id.as_deref().unwrap_or("");
    let version = raw.effective_version().unwrap_or("");
    if artifact.is_empty() {
        return Err(RegraftError::MalformedCoordinate {
            coordinate: format!("{group}:{artifact}:{version}"),
        });
    }
    Ok(format!("{group}:{artifact}:{version}"))
}

fn upsert(properties: &mut Vec<(String, String)>, name: &str, value: String) {
    match properties.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, existing)) => *existing = value,
        None => properties.push((name.to_string(), value)),
    }
}

fn upsert_managed(managed: &mut Vec<RawDependency>, entry: RawDependency) {
    let key = entry.management_key();
    match managed
        .iter_mut()
        .find(|existing| existing.management_key() == key)
    {
        Some(existing) => *existing = entry,
        None => managed.push(entry),
    }
}

fn lookup<'a>(properties: &'a [(String, String)], name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|(existing, _)| existing == name)
        .map(|(_, value)| value.as_str())
}

/// Replace every resolvable `${name}` in `text`; unresolvable placeholders
/// are left in place for the fixpoint check.
fn substitute(text: &str, properties: &[(String, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(properties, name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Run substitution over the whole property set until it stops changing,
/// bounded. A placeholder that survives is a resolution error.
fn interpolate_fixpoint(
    mut properties: Vec<(String, String)>,
    coordinate: &str,
) -> Result<Vec<(String, String)>> {
    for _pass in 0..MAX_INTERPOLATION_PASSES {
        let snapshot = properties.clone();
        let mut changed = false;
        for (_, value) in properties.iter_mut() {
            let substituted = substitute(value, &snapshot);
            if substituted != *value {
                *value = substituted;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (_, value) in &properties {
        if let Some(start) = value.find("${") {
            let placeholder = match value[start..].find('}') {
                Some(end) => &value[start..start + end + 1],
                None => &value[start..],
            };
            return Err(RegraftError::UnresolvedProperty {
                placeholder: placeholder.to_string(),
                coordinate: coordinate.to_string(),
            });
        }
    }
    Ok(properties)
}

/// Substitute placeholders in one field; whatever survives is an error.
fn resolve_text(
    text: &str,
    properties: &[(String, String)],
    coordinate: &str,
) -> Result<String> {
    let substituted = substitute(text, properties);
    if let Some(start) = substituted.find("${") {
        let placeholder = match substituted[start..].find('}') {
            Some(end) => substituted[start..start + end + 1].to_string(),
            None => substituted[start..].to_string(),
        };
        return Err(RegraftError::UnresolvedProperty {
            placeholder,
            coordinate: coordinate.to_string(),
        });
    }
    Ok(substituted)
}

/// Interpolate the identity and policy fields of a dependency entry.
/// Versions are left untouched here; they get settled (and error-checked)
/// after dependency management is applied.
fn interpolate_dependency(
    dep: &RawDependency,
    properties: &[(String, String)],
    coordinate: &str,
) -> Result<RawDependency> {
    let mut dep = dep.clone();
    dep.group_id = resolve_text(&dep.group_id, properties, coordinate)?;
    dep.artifact_id = resolve_text(&dep.artifact_id, properties, coordinate)?;
    dep.version = dep.version.as_deref().map(|v| substitute(v, properties));
    dep.scope = dep
        .scope
        .as_deref()
        .map(|s| resolve_text(s, properties, coordinate))
        .transpose()?;
    dep.classifier = dep
        .classifier
        .as_deref()
        .map(|c| resolve_text(c, properties, coordinate))
        .transpose()?;
    dep.type_ = dep
        .type_
        .as_deref()
        .map(|t| resolve_text(t, properties, coordinate))
        .transpose()?;
    dep.exclusions = dep
        .exclusions
        .iter()
        .map(|exclusion| {
            Ok(Exclusion::new(
                resolve_text(&exclusion.group_id, properties, coordinate)?,
                resolve_text(&exclusion.artifact_id, properties, coordinate)?,
            ))
        })
        .collect::<Result<_>>()?;
    Ok(dep)
}
