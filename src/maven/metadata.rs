//! Repository metadata listings (`maven-metadata.xml`).

use serde::{Deserialize, Serialize};

use crate::core::{RegraftError, Result};

/// The per-`GroupArtifact` version listing a repository publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MavenMetadata {
    pub versions: Vec<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub snapshot_timestamp: Option<String>,
}

impl MavenMetadata {
    /// Parse a `maven-metadata.xml` document. `resource` names the document
    /// in parse errors.
    pub fn parse(xml: &str, resource: &str) -> Result<MavenMetadata> {
        let doc = roxmltree::Document::parse(xml).map_err(|err| RegraftError::XmlParse {
            resource: resource.to_string(),
            reason: err.to_string(),
        })?;
        let root = doc.root_element();

        let versioning = root
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == "versioning");

        let mut metadata = MavenMetadata::default();
        if let Some(versioning) = versioning {
            for node in versioning.children().filter(|n| n.is_element()) {
                match node.tag_name().name() {
                    "latest" => metadata.latest = element_text(&node),
                    "release" => metadata.release = element_text(&node),
                    "versions" => {
                        metadata.versions = node
                            .children()
                            .filter(|child| {
                                child.is_element() && child.tag_name().name() == "version"
                            })
                            .filter_map(|child| child.text())
                            .map(|text| text.trim().to_string())
                            .filter(|text| !text.is_empty())
                            .collect();
                    }
                    "snapshot" => {
                        metadata.snapshot_timestamp = node
                            .children()
                            .find(|child| {
                                child.is_element() && child.tag_name().name() == "timestamp"
                            })
                            .and_then(|child| element_text(&child));
                    }
                    _ => {}
                }
            }
        }
        Ok(metadata)
    }

    /// Merge a listing from another repository into this one: version lists
    /// union (first-seen order preserved), scalar fields keep the first
    /// non-empty answer.
    pub fn merge(&mut self, other: MavenMetadata) {
        for version in other.versions {
            if !self.versions.contains(&version) {
                self.versions.push(version);
            }
        }
        if self.latest.is_none() {
            self.latest = other.latest;
        }
        if self.release.is_none() {
            self.release = other.release;
        }
        if self.snapshot_timestamp.is_none() {
            self.snapshot_timestamp = other.snapshot_timestamp;
        }
    }
}

fn element_text(node: &roxmltree::Node<'_, '_>) -> Option<String> {
    node.text()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"
        <metadata>
          <groupId>org.springframework.boot</groupId>
          <artifactId>spring-boot-starter-parent</artifactId>
          <versioning>
            <latest>3.0.0-M1</latest>
            <release>2.4.0</release>
            <versions>
              <version>2.3.0</version>
              <version>2.3.1</version>
              <version>2.4.0</version>
              <version>3.0.0-M1</version>
            </versions>
            <lastUpdated>20210101000000</lastUpdated>
          </versioning>
        </metadata>
    "#;

    #[test]
    fn parses_versioning_block() {
        let metadata = MavenMetadata::parse(METADATA, "test metadata").unwrap();
        assert_eq!(
            metadata.versions,
            vec!["2.3.0", "2.3.1", "2.4.0", "3.0.0-M1"]
        );
        assert_eq!(metadata.latest.as_deref(), Some("3.0.0-M1"));
        assert_eq!(metadata.release.as_deref(), Some("2.4.0"));
        assert_eq!(metadata.snapshot_timestamp, None);
    }

    #[test]
    fn merge_unions_versions() {
        let mut a = MavenMetadata {
            versions: vec!["1.0".to_string(), "1.1".to_string()],
            ..Default::default()
        };
        let b = MavenMetadata {
            versions: vec!["1.1".to_string(), "2.0".to_string()],
            release: Some("2.0".to_string()),
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(a.versions, vec!["1.0", "1.1", "2.0"]);
        assert_eq!(a.release.as_deref(), Some("2.0"));
    }

    #[test]
    fn merge_keeps_first_scalars() {
        let mut a = MavenMetadata {
            release: Some("1.0".to_string()),
            ..Default::default()
        };
        a.merge(MavenMetadata {
            release: Some("2.0".to_string()),
            ..Default::default()
        });
        assert_eq!(a.release.as_deref(), Some("1.0"));
    }

    #[test]
    fn parses_snapshot_timestamp() {
        let xml = r#"
            <metadata>
              <versioning>
                <snapshot><timestamp>20240115.093011</timestamp></snapshot>
                <versions><version>1.0-SNAPSHOT</version></versions>
              </versioning>
            </metadata>
        "#;
        let metadata = MavenMetadata::parse(xml, "snapshot metadata").unwrap();
        assert_eq!(
            metadata.snapshot_timestamp.as_deref(),
            Some("20240115.093011")
        );
    }
}
