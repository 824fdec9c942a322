//! The assembled document and its metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::ContentNode;
use super::path::Path;

/// A parsed book: content forest, metadata, toc and images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: Vec<ContentNode>,
    pub metadata: Metadata,
    pub toc: TableOfContents,
    /// Package-relative image href to base64 data.
    pub images: BTreeMap<String, String>,
    /// Package-relative href of the cover image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// Table of contents with entries resolved to content paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOfContents {
    pub title: String,
    pub items: Vec<TocItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub title: String,
    /// Nesting depth, 0 for top-level entries.
    pub level: usize,
    pub path: Path,
    /// Text length preceding `path`.
    pub position: usize,
}

/// A free-form metadata field that has no dedicated slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Book metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub contributors: Vec<String>,
    pub languages: Vec<String>,
    pub descriptions: Vec<String>,
    pub subjects: Vec<String>,
    pub rights: Option<String>,
    pub tags: Vec<Tag>,
    pub cover_href: Option<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    /// First tag value with the given name.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let mut metadata = Metadata::new("Title")
            .with_author("A. Writer")
            .with_language("en");
        metadata.tags.push(Tag::new("publisher", "Press"));

        assert_eq!(metadata.title.as_deref(), Some("Title"));
        assert_eq!(metadata.authors, vec!["A. Writer"]);
        assert_eq!(metadata.tag("publisher"), Some("Press"));
        assert_eq!(metadata.tag("date"), None);
    }

    #[test]
    fn test_document_json() {
        let document = Document {
            content: vec![ContentNode::text("x")],
            toc: TableOfContents {
                title: "Contents".to_string(),
                items: vec![TocItem {
                    title: "One".to_string(),
                    level: 0,
                    path: Path(vec![0]),
                    position: 0,
                }],
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["toc"]["items"][0]["path"], serde_json::json!([0]));
        assert!(json.get("cover").is_none());
    }
}
