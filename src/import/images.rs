//! Image collection.

use std::collections::{BTreeMap, HashSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::diagnostics::Diagnostics;
use crate::dom::local_name;
use crate::epub::Package;
use crate::model::ContentNode;
use crate::util::{has_scheme, resolve_href, split_fragment};

/// Package-relative image sources referenced by the forest, in first-seen
/// order, followed by `cover` if it is not already listed.
///
/// `src` attributes (and `xlink:href` on SVG `image` elements) are resolved
/// against the section file that owns them. Externally hosted and `data:`
/// sources are skipped.
pub fn collect_image_sources(forest: &[ContentNode], cover: Option<&str>) -> Vec<String> {
    let mut collector = SourceCollector::default();
    collector.visit(forest, "");
    if let Some(cover) = cover {
        collector.add(cover.to_string());
    }
    collector.sources
}

#[derive(Default)]
struct SourceCollector {
    seen: HashSet<String>,
    sources: Vec<String>,
}

impl SourceCollector {
    fn visit(&mut self, nodes: &[ContentNode], file: &str) {
        for node in nodes {
            let Some(element) = node.as_element() else {
                continue;
            };
            let file = element.file.as_deref().unwrap_or(file);

            let src = element.attr("src").or_else(|| {
                if local_name(&element.tag).eq_ignore_ascii_case("image") {
                    element.attr("xlink:href")
                } else {
                    None
                }
            });
            if let Some(src) = src.map(str::trim)
                && !is_external(src)
            {
                let (path, _) = split_fragment(src);
                self.add(resolve_href(file, path));
            }

            self.visit(element.children(), file);
        }
    }

    fn add(&mut self, source: String) {
        if !source.is_empty() && self.seen.insert(source.clone()) {
            self.sources.push(source);
        }
    }
}

/// True for sources that live outside the archive.
fn is_external(src: &str) -> bool {
    if src.is_empty() || has_scheme(src) || src.starts_with("//") {
        return true;
    }
    src.split('/')
        .next()
        .is_some_and(|host| host.to_ascii_lowercase().starts_with("www."))
}

/// Read and base64-encode every source. Failures are reported and skipped.
pub async fn fetch_images(
    package: &Package,
    sources: &[String],
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, String> {
    let mut images = BTreeMap::new();
    for source in sources {
        match package.read_binary(source).await {
            Ok(Some(bytes)) => {
                images.insert(source.clone(), STANDARD.encode(bytes));
            }
            Ok(None) => diagnostics.warn(format!("Image {source} not found in archive")),
            Err(e) => diagnostics.warn(format!("Archive read error for {source}: {e}")),
        }
    }
    log::debug!("Collected {} of {} images", images.len(), sources.len());
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;

    fn section(file: &str, children: Vec<ContentNode>) -> ContentNode {
        let mut body = Element::new("body").with_id(file).with_children(children);
        body.file = Some(file.to_string());
        body.into()
    }

    fn img(src: &str) -> ContentNode {
        Element::new("img").with_attr("src", src).into()
    }

    #[test]
    fn test_collect_image_sources() {
        let forest = vec![
            section(
                "text/ch1.xhtml",
                vec![
                    img("../images/a.png"),
                    img("https://example.com/b.png"),
                    img("//cdn.example.com/c.png"),
                    img("www.example.com/d.png"),
                    img("data:image/png;base64,AAAA"),
                    Element::new("p")
                        .with_children(vec![img("../images/a.png")])
                        .into(),
                ],
            ),
            section(
                "text/ch2.xhtml",
                vec![
                    img("../images/My%20Pic.jpg"),
                    Element::new("svg")
                        .with_children(vec![
                            Element::new("image")
                                .with_attr("xlink:href", "../images/cover.jpg")
                                .into(),
                        ])
                        .into(),
                ],
            ),
        ];

        assert_eq!(
            collect_image_sources(&forest, Some("images/cover.jpg")),
            vec!["images/a.png", "images/My Pic.jpg", "images/cover.jpg"]
        );
        assert_eq!(
            collect_image_sources(&forest[..1], Some("images/cover.jpg")),
            vec!["images/a.png", "images/cover.jpg"]
        );
    }

    #[test]
    fn test_is_external() {
        assert!(is_external("http://x/y.png"));
        assert!(is_external("WWW.example.com/y.png"));
        assert!(!is_external("images/www.png"));
        assert!(!is_external("../images/y.png"));
    }
}
