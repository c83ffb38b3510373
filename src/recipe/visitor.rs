//! Variant-dispatched tree visitors.
//!
//! A [`TagVisitor`] is a set of per-node-kind handler functions; the
//! built-in traversal routes each node to its handler and recurses into
//! children by default, so "overriding" a hook means setting one function
//! field. Handlers receive the node, the path of ancestor tag names, and
//! the execution context; returning `Some(tag)` replaces the node before
//! traversal descends into it.
//!
//! Visitors must be pure functions of tree plus context: re-running a
//! visitor on its own output is a no-op. Mutations that depend on other
//! parts of the tree are expressed by scheduling a follow-up visitor via
//! [`ExecutionContext::after_visit`], which the driver drains after the
//! current traversal.

use std::sync::Arc;

use crate::core::{ExecutionContext, Result};
use crate::xml::Tag;

/// Handler for the document root, before tag traversal starts.
pub type DocumentHandler =
    Arc<dyn Fn(&Tag, &ExecutionContext) -> Result<Option<Tag>> + Send + Sync>;

/// Handler invoked for every tag, root included. The second argument is
/// the ancestor tag names, outermost first (empty at the root).
pub type TagHandler =
    Arc<dyn Fn(&Tag, &[String], &ExecutionContext) -> Result<Option<Tag>> + Send + Sync>;

/// A visitor over a [`Tag`] tree.
#[derive(Clone, Default)]
pub struct TagVisitor {
    name: String,
    on_document: Option<DocumentHandler>,
    on_tag: Option<TagHandler>,
}

impl TagVisitor {
    pub fn new(name: impl Into<String>) -> TagVisitor {
        TagVisitor {
            name: name.into(),
            on_document: None,
            on_tag: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_document(
        mut self,
        handler: impl Fn(&Tag, &ExecutionContext) -> Result<Option<Tag>> + Send + Sync + 'static,
    ) -> TagVisitor {
        self.on_document = Some(Arc::new(handler));
        self
    }

    pub fn on_tag(
        mut self,
        handler: impl Fn(&Tag, &[String], &ExecutionContext) -> Result<Option<Tag>>
            + Send
            + Sync
            + 'static,
    ) -> TagVisitor {
        self.on_tag = Some(Arc::new(handler));
        self
    }

    /// Apply this visitor to a document, producing the transformed tree.
    pub fn visit(&self, document: &Tag, ctx: &ExecutionContext) -> Result<Tag> {
        let document = match &self.on_document {
            Some(handler) => handler(document, ctx)?.unwrap_or_else(|| document.clone()),
            None => document.clone(),
        };
        let mut path = Vec::new();
        self.visit_tag(document, &mut path, ctx)
    }

    fn visit_tag(
        &self,
        tag: Tag,
        path: &mut Vec<String>,
        ctx: &ExecutionContext,
    ) -> Result<Tag> {
        let mut tag = match &self.on_tag {
            Some(handler) => handler(&tag, path, ctx)?.unwrap_or(tag),
            None => tag,
        };
        path.push(tag.name.clone());
        let children = std::mem::take(&mut tag.children);
        tag.children = children
            .into_iter()
            .map(|child| self.visit_tag(child, path, ctx))
            .collect::<Result<_>>()?;
        path.pop();
        Ok(tag)
    }
}
