//! Stylesheet assembly from a section's `<head>`.

use crate::css::Stylesheet;
use crate::diagnostics::Diagnostics;
use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId};
use crate::epub::Package;
use crate::util::{has_scheme, resolve_href, split_fragment};

/// A stylesheet referenced from a section head, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// `<link rel="stylesheet">`, package-relative.
    Linked(String),
    /// Contents of a `<style>` element.
    Inline(String),
}

/// Collect the stylesheets a section head declares.
///
/// `file` is the section's package-relative name; linked hrefs are resolved
/// against it.
pub fn collect_style_sources(
    dom: &ArenaDom,
    file: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<StyleSource> {
    let Some(head) = dom.find_by_tag("head") else {
        return Vec::new();
    };

    let mut sources = Vec::new();
    for child in dom.children(head) {
        let Some(node) = dom.get(child) else {
            continue;
        };
        match &node.data {
            ArenaNodeData::Text(text) => {
                if !text.trim().is_empty() {
                    diagnostics.warn(format!("Unexpected text in head of {file}: {:?}", text.trim()));
                }
            }
            ArenaNodeData::Element { .. } => {
                if let Some(source) = head_element(dom, child, file, diagnostics) {
                    sources.push(source);
                }
            }
            ArenaNodeData::Document => {}
        }
    }
    sources
}

fn head_element(
    dom: &ArenaDom,
    id: ArenaNodeId,
    file: &str,
    diagnostics: &mut Diagnostics,
) -> Option<StyleSource> {
    let name = dom.local_name(id)?.to_ascii_lowercase();
    let is_css = dom
        .get_attr(id, "type")
        .is_none_or(|t| t.trim().eq_ignore_ascii_case("text/css"));

    match name.as_str() {
        "title" | "meta" => None,
        "link" => {
            let rel = dom.get_attr(id, "rel").unwrap_or_default();
            let is_stylesheet = rel
                .split_ascii_whitespace()
                .any(|r| r.eq_ignore_ascii_case("stylesheet"));
            if !is_stylesheet || !is_css {
                diagnostics.info(format!("Ignoring link rel=\"{rel}\" in {file}"));
                return None;
            }
            let href = match dom.get_attr(id, "href") {
                Some(href) if !href.trim().is_empty() => href.trim(),
                _ => {
                    diagnostics.warn(format!("Stylesheet link without href in {file}"));
                    return None;
                }
            };
            if has_scheme(href) || href.starts_with("//") {
                diagnostics.info(format!("Ignoring external stylesheet {href}"));
                return None;
            }
            let (path, _) = split_fragment(href);
            Some(StyleSource::Linked(resolve_href(file, path)))
        }
        "style" => {
            if !is_css {
                diagnostics.info(format!(
                    "Ignoring style of type {:?} in {file}",
                    dom.get_attr(id, "type").unwrap_or_default()
                ));
                return None;
            }
            Some(StyleSource::Inline(dom.collect_text(id)))
        }
        other => {
            diagnostics.warn(format!("Unsupported <{other}> in head of {file}"));
            None
        }
    }
}

/// Load and concatenate every stylesheet of a section head.
///
/// Linked sheets are read through the package; missing or unreadable sheets
/// are reported and skipped.
pub async fn load_stylesheet(
    package: &Package,
    dom: &ArenaDom,
    file: &str,
    media_types: &[String],
    diagnostics: &mut Diagnostics,
) -> Stylesheet {
    let mut stylesheet = Stylesheet::default();

    for source in collect_style_sources(dom, file, diagnostics) {
        let css = match source {
            StyleSource::Inline(css) => css,
            StyleSource::Linked(path) => match package.read_text(&path).await {
                Ok(Some(css)) => css,
                Ok(None) => {
                    diagnostics.warn(format!("Stylesheet {path} not found"));
                    continue;
                }
                Err(e) => {
                    diagnostics.warn(format!("Archive read error for {path}: {e}"));
                    continue;
                }
            },
        };
        stylesheet.append(Stylesheet::parse_for_media(&css, media_types, diagnostics));
    }

    stylesheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::dom::parse_xml;

    fn sources(xml: &str, file: &str) -> (Vec<StyleSource>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let dom = parse_xml(xml, &mut diagnostics);
        let sources = collect_style_sources(&dom, file, &mut diagnostics);
        (sources, diagnostics)
    }

    #[test]
    fn test_links_and_styles_in_order() {
        let (sources, diagnostics) = sources(
            r#"<html><head>
                <title>Chapter</title>
                <meta charset="utf-8"/>
                <link rel="stylesheet" type="text/css" href="../css/main.css"/>
                <style type="text/css">p { color: red }</style>
                <link rel="stylesheet" href="extra%20one.css#ignored"/>
            </head><body/></html>"#,
            "text/ch1.xhtml",
        );
        assert_eq!(
            sources,
            vec![
                StyleSource::Linked("css/main.css".to_string()),
                StyleSource::Inline("p { color: red }".to_string()),
                StyleSource::Linked("text/extra one.css".to_string()),
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_other_links_are_info() {
        let (sources, diagnostics) = sources(
            r#"<html><head>
                <link rel="alternate" href="feed.xml"/>
                <link rel="stylesheet" type="text/xsl" href="a.xsl"/>
            </head></html>"#,
            "ch.xhtml",
        );
        assert!(sources.is_empty());
        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.severity == Some(Severity::Info))
        );
    }

    #[test]
    fn test_unsupported_head_content() {
        let (sources, diagnostics) = sources(
            r#"<html><head>stray<script src="x.js"></script></head></html>"#,
            "ch.xhtml",
        );
        assert!(sources.is_empty());
        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.severity == Some(Severity::Warning))
        );
    }

    #[test]
    fn test_no_head() {
        let (sources, diagnostics) = sources("<html><body><p>x</p></body></html>", "ch.xhtml");
        assert!(sources.is_empty());
        assert!(diagnostics.is_empty());
    }
}
