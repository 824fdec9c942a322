//! Paragraph boundary marking.

use crate::dom::local_name;
use crate::model::ContentNode;

/// Mark innermost `div`/`p` elements as paragraphs.
///
/// Post-order: an element is marked only when none of its descendants is,
/// so nested containers never count twice.
pub fn mark_paragraphs(forest: &mut [ContentNode]) {
    for node in forest.iter_mut() {
        mark(node);
    }
}

/// Returns whether the subtree now contains a paragraph.
fn mark(node: &mut ContentNode) -> bool {
    let Some(element) = node.as_element_mut() else {
        return false;
    };

    let mut contains_paragraph = false;
    if let Some(children) = element.children.as_mut() {
        for child in children.iter_mut() {
            contains_paragraph |= mark(child);
        }
    }
    if contains_paragraph {
        return true;
    }

    let tag = local_name(&element.tag);
    if tag.eq_ignore_ascii_case("p") || tag.eq_ignore_ascii_case("div") {
        element.paragraph = true;
        return true;
    }
    false
}
