//! Transform a section's ArenaDom into a content element.

use std::collections::BTreeMap;

use crate::css::{ElementRef, Stylesheet, compute_style};
use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};
use crate::error::{Error, Result};
use crate::model::{ContentNode, Element};
use crate::util::{has_scheme, resolve_href, split_fragment};

/// Transform the `<body>` of a section into a content element.
///
/// The body element gets the section's file name as both `id` and `file`;
/// every descendant id becomes `file/localId`.
pub fn transform_section(dom: &ArenaDom, stylesheet: &Stylesheet, file: &str) -> Result<Element> {
    let body = dom
        .find_by_tag("body")
        .ok_or_else(|| Error::MissingBody(file.to_string()))?;

    let ctx = TransformContext {
        dom,
        stylesheet,
        file,
    };
    let mut element = ctx.element(body);
    element.id = Some(file.to_string());
    element.file = Some(file.to_string());
    Ok(element)
}

/// Context for the transform operation.
struct TransformContext<'a> {
    dom: &'a ArenaDom,
    stylesheet: &'a Stylesheet,
    /// Package-relative section file name.
    file: &'a str,
}

impl TransformContext<'_> {
    fn node(&self, id: ArenaNodeId) -> Option<ContentNode> {
        match &self.dom.get(id)?.data {
            ArenaNodeData::Text(text) => Some(ContentNode::text(text.clone())),
            ArenaNodeData::Element { .. } => Some(self.element(id).into()),
            ArenaNodeData::Document => None,
        }
    }

    fn element(&self, id: ArenaNodeId) -> Element {
        let tag = self.dom.element_name(id).unwrap_or_default();
        let style = compute_style(
            ElementRef::new(self.dom, id),
            self.stylesheet,
            self.dom.get_attr(id, "style"),
        );
        let children: Vec<ContentNode> = self
            .dom
            .children(id)
            .filter_map(|child| self.node(child))
            .collect();

        let mut element = Element::new(tag).with_children(children);
        element.id = self
            .dom
            .element_id(id)
            .map(|local| format!("{}/{local}", self.file));
        element.style = style;
        element.attrs = self.attrs(self.dom.attrs(id));
        element
    }

    /// Remaining attributes, renamed for the content model.
    fn attrs(&self, attrs: &[Attribute]) -> Option<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        for attr in attrs {
            let (name, value) = match attr.name.as_str() {
                "id" | "class" | "style" => continue,
                "xml:space" => ("xmlSpace", attr.value.clone()),
                "colspan" => ("colSpan", attr.value.clone()),
                "rowspan" => ("rowSpan", attr.value.clone()),
                "href" => ("href", self.rewrite_href(&attr.value)),
                other => (other, attr.value.clone()),
            };
            map.insert(name.to_string(), value);
        }
        (!map.is_empty()).then_some(map)
    }

    /// Rewrite an internal href to the `#file/anchor` form.
    fn rewrite_href(&self, href: &str) -> String {
        let href = href.trim();
        if has_scheme(href) || href.starts_with("//") {
            return href.to_string();
        }
        let resolved = resolve_href(self.file, href);
        match split_fragment(&resolved) {
            (file, Some(fragment)) if !fragment.is_empty() => format!("#{file}/{fragment}"),
            (file, _) => format!("#{file}"),
        }
    }
}
