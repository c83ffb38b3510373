//! Built-in manifest recipes and their registry.

mod upgrade_parent;

use std::sync::Arc;

use crate::maven::PomDownloader;
use crate::recipe::declarative::param_str;
use crate::recipe::RecipeRegistry;
use crate::xml::Tag;

pub use upgrade_parent::{ChangeParentVersion, UpgradeParentVersion};

/// A registry with every built-in recipe registered. Recipes that download
/// metadata share the given downloader.
pub fn builtin_registry(downloader: Arc<PomDownloader>) -> RecipeRegistry {
    let mut registry = RecipeRegistry::new();

    {
        let downloader = Arc::clone(&downloader);
        registry.register("regraft.maven.UpgradeParentVersion", move |params| {
            Ok(Arc::new(UpgradeParentVersion::new(
                param_str(params, "groupId").unwrap_or_default(),
                param_str(params, "artifactId").unwrap_or_default(),
                param_str(params, "newVersion").unwrap_or_default(),
                param_str(params, "versionPattern"),
                Arc::clone(&downloader),
            )) as Arc<dyn crate::recipe::Recipe>)
        });
    }

    registry.register("regraft.maven.ChangeParentVersion", move |params| {
        Ok(Arc::new(ChangeParentVersion::new(
            param_str(params, "groupId").unwrap_or_default(),
            param_str(params, "artifactId").unwrap_or_default(),
            param_str(params, "newVersion").unwrap_or_default(),
        )) as Arc<dyn crate::recipe::Recipe>)
    });

    registry
}

/// Whether `tag` is the `<parent>` declaration directly under the
/// document's `<project>` root.
pub(crate) fn is_parent_tag(tag: &Tag, path: &[String]) -> bool {
    tag.name == "parent" && path.len() == 1 && path[0] == "project"
}
