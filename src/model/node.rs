//! Content tree nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::path::Path;

/// A node of the content forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentNode {
    Element(Element),
    Text { text: String },
    /// Placeholder for a node outside a requested range; keeps its length.
    Stub { length: usize },
}

/// An element of the content forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    /// Document-wide id: `file/localId`, or the file name for section roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ContentNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<BTreeMap<String, String>>,
    /// Source section, set on section roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Target of an internal link, once resolved.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Path>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paragraph: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ContentNode>) -> Self {
        self.children = if children.is_empty() {
            None
        } else {
            Some(children)
        };
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn children(&self) -> &[ContentNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name).map(String::as_str)
    }
}

impl ContentNode {
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text { text: text.into() }
    }

    pub fn stub(length: usize) -> Self {
        ContentNode::Stub { length }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ContentNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            ContentNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Children of an element; empty for leaves.
    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Element(element) => element.children(),
            _ => &[],
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, ContentNode::Stub { .. })
    }
}

impl From<Element> for ContentNode {
    fn from(element: Element) -> Self {
        ContentNode::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut element = Element::new("p")
            .with_id("ch1.xhtml/x")
            .with_children(vec![ContentNode::text("Hello")]);
        element.reference = Some(Path(vec![0, 2]));
        element.paragraph = true;

        let json = serde_json::to_value(ContentNode::from(element)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "element",
                "tag": "p",
                "id": "ch1.xhtml/x",
                "children": [{ "type": "text", "text": "Hello" }],
                "ref": [0, 2],
                "paragraph": true,
            })
        );
    }

    #[test]
    fn test_stub_json() {
        let json = serde_json::to_value(ContentNode::stub(12)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "stub", "length": 12 }));
        let back: ContentNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, ContentNode::stub(12));
    }

    #[test]
    fn test_empty_children_are_none() {
        let element = Element::new("br").with_children(Vec::new());
        assert_eq!(element.children, None);
        assert!(element.children().is_empty());
    }
}
