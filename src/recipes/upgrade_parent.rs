//! Upgrade a POM's parent coordinate to the latest version matching a
//! selector.
//!
//! [`UpgradeParentVersion`] reads the parent tag, asks the downloader for
//! the group's metadata listing (once per document), filters the versions
//! through the configured comparator, and, when a strictly newer match
//! exists, schedules a [`ChangeParentVersion`] follow-up to rewrite the
//! `<version>` tag. The rewrite itself never downloads anything, so the
//! second fixpoint cycle observes a tree the visitor leaves unchanged.

use std::sync::{Arc, Mutex, PoisonError};

use crate::core::RegraftError;
use crate::maven::{GroupArtifact, PomDownloader};
use crate::recipe::{Recipe, TagVisitor, Validated};
use crate::recipes::is_parent_tag;
use crate::version::Semver;

/// Rewrite the parent `<version>` tag to a fixed value.
pub struct ChangeParentVersion {
    group_id: String,
    artifact_id: String,
    new_version: String,
}

impl ChangeParentVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            new_version: new_version.into(),
        }
    }
}

pub(crate) fn change_parent_visitor(
    group_id: String,
    artifact_id: String,
    new_version: String,
) -> TagVisitor {
    TagVisitor::new("change-parent-version").on_tag(move |tag, path, _ctx| {
        if is_parent_tag(tag, path)
            && tag.child_value("groupId") == Some(group_id.as_str())
            && tag.child_value("artifactId") == Some(artifact_id.as_str())
            && tag
                .child_value("version")
                .is_some_and(|version| version != new_version)
        {
            Ok(Some(tag.with_child_value("version", &new_version)))
        } else {
            Ok(None)
        }
    })
}

impl Recipe for ChangeParentVersion {
    fn name(&self) -> &str {
        "regraft.maven.ChangeParentVersion"
    }

    fn display_name(&self) -> &str {
        "Change Maven parent version"
    }

    fn description(&self) -> &str {
        "Set the parent coordinate's version tag to a fixed value."
    }

    fn validate(&self) -> Validated {
        let mut validated = Validated::valid();
        if self.group_id.is_empty() {
            validated = validated.and(Validated::invalid("groupId", "must not be empty"));
        }
        if self.artifact_id.is_empty() {
            validated = validated.and(Validated::invalid("artifactId", "must not be empty"));
        }
        if self.new_version.is_empty() {
            validated = validated.and(Validated::invalid("newVersion", "must not be empty"));
        }
        validated
    }

    fn visitor(&self) -> Option<TagVisitor> {
        Some(change_parent_visitor(
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.new_version.clone(),
        ))
    }
}

/// Upgrade the parent coordinate to the newest version matching a
/// selector such as `2.X` or `latest.release`.
pub struct UpgradeParentVersion {
    group_id: String,
    artifact_id: String,
    new_version: String,
    version_pattern: Option<String>,
    downloader: Arc<PomDownloader>,
}

impl UpgradeParentVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        new_version: impl Into<String>,
        version_pattern: Option<String>,
        downloader: Arc<PomDownloader>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            new_version: new_version.into(),
            version_pattern,
            downloader,
        }
    }
}

impl Recipe for UpgradeParentVersion {
    fn name(&self) -> &str {
        "regraft.maven.UpgradeParentVersion"
    }

    fn display_name(&self) -> &str {
        "Upgrade Maven parent version"
    }

    fn description(&self) -> &str {
        "Upgrade the parent coordinate to the latest version matching the \
         configured selector."
    }

    fn validate(&self) -> Validated {
        let mut validated = Validated::valid();
        if self.group_id.is_empty() {
            validated = validated.and(Validated::invalid("groupId", "must not be empty"));
        }
        if self.artifact_id.is_empty() {
            validated = validated.and(Validated::invalid("artifactId", "must not be empty"));
        }
        if let Err(err) = Semver::validate(&self.new_version, self.version_pattern.as_deref()) {
            validated = validated.and(Validated::invalid("newVersion", err.to_string()));
        }
        validated
    }

    fn visitor(&self) -> Option<TagVisitor> {
        let comparator =
            Semver::validate(&self.new_version, self.version_pattern.as_deref()).ok()?;
        let downloader = Arc::clone(&self.downloader);
        let group_id = self.group_id.clone();
        let artifact_id = self.artifact_id.clone();
        // Metadata is fetched once per document and reused across the
        // traversal.
        let available: Mutex<Option<Vec<String>>> = Mutex::new(None);

        Some(
            TagVisitor::new("upgrade-parent-version").on_tag(move |tag, path, ctx| {
                if !is_parent_tag(tag, path)
                    || tag.child_value("groupId") != Some(group_id.as_str())
                    || tag.child_value("artifactId") != Some(artifact_id.as_str())
                {
                    return Ok(None);
                }
                let Some(current) = tag.child_value("version") else {
                    return Ok(None);
                };

                let mut cached = available.lock().unwrap_or_else(PoisonError::into_inner);
                if cached.is_none() {
                    let group_artifact = GroupArtifact::new(&group_id, &artifact_id);
                    let versions =
                        match downloader.download_metadata(&group_artifact, &[], ctx) {
                            Ok(metadata) => metadata.versions,
                            // No listing anywhere means nothing to offer,
                            // not a broken document.
                            Err(RegraftError::MetadataNotFound { .. }) => Vec::new(),
                            Err(err) => return Err(err),
                        };
                    *cached = Some(
                        versions
                            .into_iter()
                            .filter(|candidate| comparator.is_valid(Some(current), candidate))
                            .collect(),
                    );
                }

                let versions = cached.as_deref().unwrap_or_default();
                if let Some(newer) = comparator.upgrade(current, versions) {
                    ctx.after_visit(change_parent_visitor(
                        group_id.clone(),
                        artifact_id.clone(),
                        newer.to_string(),
                    ));
                }
                Ok(None)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionContext;
    use crate::recipe::run_recipe;
    use crate::xml::Tag;

    fn doc() -> Tag {
        Tag::parse(
            "<project><parent>\
             <groupId>org.springframework.boot</groupId>\
             <artifactId>spring-boot-starter-parent</artifactId>\
             <version>2.3.0</version>\
             </parent><artifactId>demo</artifactId></project>",
            "test",
        )
        .unwrap()
    }

    #[test]
    fn change_parent_version_rewrites_matching_parent() {
        let recipe = ChangeParentVersion::new(
            "org.springframework.boot",
            "spring-boot-starter-parent",
            "2.4.0",
        );
        let result = run_recipe(&recipe, &doc(), &ExecutionContext::new()).unwrap();
        assert_eq!(
            result.child("parent").unwrap().child_value("version"),
            Some("2.4.0")
        );
    }

    #[test]
    fn change_parent_version_ignores_other_parents() {
        let recipe = ChangeParentVersion::new("com.other", "parent", "9.9");
        let tree = doc();
        let result = run_recipe(&recipe, &tree, &ExecutionContext::new()).unwrap();
        assert_eq!(result, tree);
    }

    struct NotFoundTransport;

    impl crate::maven::Transport for NotFoundTransport {
        fn get(&self, _url: &str) -> crate::core::Result<crate::maven::Fetched> {
            Ok(crate::maven::Fetched::NotFound)
        }
    }

    #[test]
    fn upgrade_parent_validates_its_selector() {
        let downloader = Arc::new(PomDownloader::new(
            Arc::new(crate::cache::NoopPomCache),
            Arc::new(NotFoundTransport),
        ));
        let recipe = UpgradeParentVersion::new(
            "org.springframework.boot",
            "spring-boot-starter-parent",
            "not a selector!",
            None,
            downloader,
        );
        let validated = recipe.validate();
        assert!(!validated.is_valid());
        assert_eq!(validated.problems()[0].property, "newVersion");
    }
}
