//! A minimal owned tag tree for manifest rewriting.
//!
//! Recipes do not rewrite [`RawPom`](crate::maven::RawPom) values; that
//! model is lossy by design. They visit a [`Tag`] tree parsed from the
//! manifest text, so a rewrite can replace one `<version>` value and leave
//! everything else intact. The tree is element-only: each tag has a name,
//! an optional text value, and child tags in document order.

use crate::core::{RegraftError, Result};

/// One element in the manifest tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// Text content, present only on leaf tags.
    pub value: Option<String>,
    pub children: Vec<Tag>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Parse an XML document into a tag tree. `resource` names the
    /// document in parse errors.
    pub fn parse(xml: &str, resource: &str) -> Result<Tag> {
        let doc = roxmltree::Document::parse(xml).map_err(|err| RegraftError::XmlParse {
            resource: resource.to_string(),
            reason: err.to_string(),
        })?;
        Ok(from_node(&doc.root_element()))
    }

    pub fn child(&self, name: &str) -> Option<&Tag> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|child| child.value.as_deref())
    }

    /// A copy of this tag with the named child's value replaced. Absent
    /// children are left absent; rewriting never invents tags.
    pub fn with_child_value(&self, name: &str, value: &str) -> Tag {
        let mut copy = self.clone();
        for child in &mut copy.children {
            if child.name == name {
                child.value = Some(value.to_string());
            }
        }
        copy
    }

    /// Render back to indented XML.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match (&self.value, self.children.is_empty()) {
            (Some(value), true) => {
                out.push_str(&format!("{indent}<{0}>{1}</{0}>\n", self.name, value));
            }
            (None, true) => {
                out.push_str(&format!("{indent}<{}/>\n", self.name));
            }
            _ => {
                out.push_str(&format!("{indent}<{}>\n", self.name));
                if let Some(value) = &self.value {
                    out.push_str(&format!("{indent}  {value}\n"));
                }
                for child in &self.children {
                    child.render_into(out, depth + 1);
                }
                out.push_str(&format!("{indent}</{}>\n", self.name));
            }
        }
    }
}

fn from_node(node: &roxmltree::Node<'_, '_>) -> Tag {
    let children: Vec<Tag> = node
        .children()
        .filter(|child| child.is_element())
        .map(|child| from_node(&child))
        .collect();
    let value = if children.is_empty() {
        node.text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    } else {
        None
    };
    Tag {
        name: node.tag_name().name().to_string(),
        value,
        children,
    }
}
