//! Typed metadata from raw OPF metadata fields.

use serde_json::json;

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::epub::MetadataFields;
use crate::model::{Metadata, Tag};

/// Route raw package metadata into a [`Metadata`] value.
///
/// Keys lose their `dc:` prefix. Unrecognized keys become tags, dates become
/// tags named by their event. A missing title is reported as an error.
pub fn build_metadata(
    fields: &MetadataFields,
    cover_href: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Metadata {
    let mut metadata = Metadata {
        cover_href: cover_href.map(str::to_string),
        ..Default::default()
    };
    let mut rights: Vec<String> = Vec::new();

    for (key, values) in fields.iter() {
        let name = key.strip_prefix("dc:").unwrap_or(key);
        for value in values {
            let text = value.text.trim();
            if text.is_empty() {
                continue;
            }
            match name {
                "title" => {
                    if metadata.title.is_none() {
                        metadata.title = Some(text.to_string());
                    }
                }
                "creator" => metadata.authors.push(text.to_string()),
                "contributor" => metadata.contributors.push(text.to_string()),
                "language" => metadata.languages.push(text.to_string()),
                "description" => metadata.descriptions.push(text.to_string()),
                "subject" => metadata.subjects.extend(
                    text.split(" -- ")
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                "rights" => {
                    if !rights.iter().any(|r| r == text) {
                        rights.push(text.to_string());
                    }
                }
                "date" => metadata
                    .tags
                    .push(Tag::new(value.event.as_deref().unwrap_or("date"), text)),
                // Routed through the manifest
                "cover" => {}
                other => metadata.tags.push(Tag::new(other, text)),
            }
        }
    }

    if rights.len() > 1 {
        diagnostics.warn_with(
            format!("{} different rights statements, joined", rights.len()),
            json!({ "rights": rights }),
        );
    }
    if !rights.is_empty() {
        metadata.rights = Some(rights.join(" "));
    }

    if metadata.title.is_none() {
        diagnostics.push(
            Diagnostic::new("Package metadata has no title").with_severity(Severity::Error),
        );
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::MetadataValue;

    fn value(text: &str) -> MetadataValue {
        MetadataValue {
            text: text.to_string(),
            event: None,
        }
    }

    fn fields(entries: &[(&str, MetadataValue)]) -> MetadataFields {
        let mut fields = MetadataFields::new();
        for (key, value) in entries {
            fields.push(*key, value.clone());
        }
        fields
    }

    #[test]
    fn test_routes_known_fields() {
        let fields = fields(&[
            ("dc:title", value("First")),
            ("dc:title", value("Second")),
            ("dc:creator", value("A. Writer")),
            ("dc:contributor", value("Editor")),
            ("dc:language", value("en")),
            ("dc:description", value("About things")),
            ("dc:subject", value("Fiction -- Adventure")),
            ("dc:subject", value("Sea stories")),
            ("dc:publisher", value("Press")),
            (
                "dc:date",
                MetadataValue {
                    text: "1851".to_string(),
                    event: Some("publication".to_string()),
                },
            ),
            ("dc:date", value("2001-01-01")),
            ("cover", value("cover-img")),
        ]);
        let mut diagnostics = Diagnostics::new();
        let metadata = build_metadata(&fields, Some("images/cover.jpg"), &mut diagnostics);

        assert_eq!(metadata.title.as_deref(), Some("First"));
        assert_eq!(metadata.authors, vec!["A. Writer"]);
        assert_eq!(metadata.contributors, vec!["Editor"]);
        assert_eq!(metadata.languages, vec!["en"]);
        assert_eq!(metadata.descriptions, vec!["About things"]);
        assert_eq!(metadata.subjects, vec!["Fiction", "Adventure", "Sea stories"]);
        assert_eq!(
            metadata.tags,
            vec![
                Tag::new("publisher", "Press"),
                Tag::new("publication", "1851"),
                Tag::new("date", "2001-01-01"),
            ]
        );
        assert_eq!(metadata.cover_href.as_deref(), Some("images/cover.jpg"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_conflicting_rights() {
        let fields = fields(&[
            ("dc:title", value("T")),
            ("dc:rights", value("Public domain.")),
            ("dc:rights", value("Public domain.")),
            ("dc:rights", value("All rights reserved.")),
        ]);
        let mut diagnostics = Diagnostics::new();
        let metadata = build_metadata(&fields, None, &mut diagnostics);

        assert_eq!(
            metadata.rights.as_deref(),
            Some("Public domain. All rights reserved.")
        );
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.severity, Some(Severity::Warning));
        assert!(diagnostic.data.is_some());
    }

    #[test]
    fn test_missing_title_is_error() {
        let fields = fields(&[("dc:creator", value("Someone"))]);
        let mut diagnostics = Diagnostics::new();
        let metadata = build_metadata(&fields, None, &mut diagnostics);

        assert_eq!(metadata.title, None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().severity,
            Some(Severity::Error)
        );
    }
}
