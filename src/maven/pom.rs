//! The raw POM model and its XML parser.
//!
//! [`RawPom`] is the manifest exactly as declared, before parent
//! inheritance or interpolation. It is immutable after parse; the resolver
//! produces a [`ResolvedPom`](crate::maven::resolver::ResolvedPom) from it
//! without mutating it.

use serde::{Deserialize, Serialize};

use crate::core::{RegraftError, Result};
use crate::maven::coordinates::{Exclusion, Repository};

/// A `<parent>` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub relative_path: Option<String>,
}

/// A `<dependency>` entry, either in `<dependencies>` or in
/// `<dependencyManagement>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl RawDependency {
    /// The dedup key dependency management and nearest-wins use:
    /// `(groupId, artifactId, classifier, type)`.
    pub fn management_key(&self) -> (String, String, Option<String>, Option<String>) {
        (
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.classifier.clone(),
            self.type_.clone(),
        )
    }

    /// Whether this managed entry imports a BOM rather than pinning a
    /// version: `scope=import` with `type=pom`.
    pub fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.type_.as_deref() == Some("pom")
    }
}

/// A parsed manifest before inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<RawParent>,
    /// Declaration-ordered property map.
    pub properties: Vec<(String, String)>,
    pub dependency_management: Vec<RawDependency>,
    pub dependencies: Vec<RawDependency>,
    pub repositories: Vec<Repository>,
    pub modules: Vec<String>,
}

impl RawPom {
    /// Parse POM XML. `resource` names the document in parse errors
    /// (a URL or file description).
    pub fn parse(xml: &str, resource: &str) -> Result<RawPom> {
        let doc = roxmltree::Document::parse(xml).map_err(|err| RegraftError::XmlParse {
            resource: resource.to_string(),
            reason: err.to_string(),
        })?;
        let project = doc.root_element();
        if project.tag_name().name() != "project" {
            return Err(RegraftError::XmlParse {
                resource: resource.to_string(),
                reason: format!(
                    "expected <project> root, found <{}>",
                    project.tag_name().name()
                ),
            });
        }

        let parent = child_element(&project, "parent").map(|node| RawParent {
            group_id: child_text(&node, "groupId").unwrap_or_default(),
            artifact_id: child_text(&node, "artifactId").unwrap_or_default(),
            version: child_text(&node, "version").unwrap_or_default(),
            relative_path: child_text(&node, "relativePath"),
        });

        let properties = child_element(&project, "properties")
            .map(|node| {
                node.children()
                    .filter(|child| child.is_element())
                    .map(|child| {
                        (
                            child.tag_name().name().to_string(),
                            child.text().unwrap_or("").trim().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let dependency_management = child_element(&project, "dependencyManagement")
            .and_then(|node| child_element(&node, "dependencies"))
            .map(|node| parse_dependencies(&node))
            .unwrap_or_default();

        let dependencies = child_element(&project, "dependencies")
            .map(|node| parse_dependencies(&node))
            .unwrap_or_default();

        let repositories = child_element(&project, "repositories")
            .map(|node| parse_repositories(&node))
            .unwrap_or_default();

        let modules = child_element(&project, "modules")
            .map(|node| {
                node.children()
                    .filter(|child| child.is_element() && child.tag_name().name() == "module")
                    .filter_map(|child| child.text())
                    .map(|text| text.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(RawPom {
            group_id: child_text(&project, "groupId"),
            artifact_id: child_text(&project, "artifactId"),
            version: child_text(&project, "version"),
            packaging: child_text(&project, "packaging"),
            parent,
            properties,
            dependency_management,
            dependencies,
            repositories,
            modules,
        })
    }

    /// `groupId`, falling back to the parent declaration.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// `version`, falling back to the parent declaration.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }
}

fn parse_dependencies(deps_node: &roxmltree::Node<'_, '_>) -> Vec<RawDependency> {
    deps_node
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "dependency")
        .map(|node| {
            let exclusions = child_element(&node, "exclusions")
                .map(|exclusions_node| {
                    exclusions_node
                        .children()
                        .filter(|child| {
                            child.is_element() && child.tag_name().name() == "exclusion"
                        })
                        .map(|child| {
                            Exclusion::new(
                                child_text(&child, "groupId").unwrap_or_else(|| "*".to_string()),
                                child_text(&child, "artifactId")
                                    .unwrap_or_else(|| "*".to_string()),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();

            RawDependency {
                group_id: child_text(&node, "groupId").unwrap_or_default(),
                artifact_id: child_text(&node, "artifactId").unwrap_or_default(),
                version: child_text(&node, "version"),
                classifier: child_text(&node, "classifier"),
                type_: child_text(&node, "type"),
                scope: child_text(&node, "scope"),
                optional: child_text(&node, "optional").as_deref() == Some("true"),
                exclusions,
            }
        })
        .collect()
}

fn parse_repositories(repos_node: &roxmltree::Node<'_, '_>) -> Vec<Repository> {
    repos_node
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "repository")
        .filter_map(|node| {
            let uri = child_text(&node, "url")?;
            let enabled = |policy: &str| {
                child_element(&node, policy)
                    .and_then(|p| child_text(&p, "enabled"))
                    .map(|v| v == "true")
            };
            Some(Repository {
                id: child_text(&node, "id").unwrap_or_default(),
                uri,
                releases: enabled("releases").unwrap_or(true),
                snapshots: enabled("snapshots").unwrap_or(false),
            })
        })
        .collect()
}

fn child_element<'a>(
    node: &roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
