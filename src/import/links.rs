//! Id index and internal link resolution.

use std::collections::HashMap;

use crate::model::{ContentNode, Path};

/// Map from document-wide element id to its path in the forest.
///
/// When an id occurs more than once, the first occurrence in document order
/// wins.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    paths: HashMap<String, Path>,
}

impl IdIndex {
    pub fn build(forest: &[ContentNode]) -> Self {
        let mut index = Self::default();
        index.visit(forest, &mut Vec::new());
        index
    }

    fn visit(&mut self, nodes: &[ContentNode], prefix: &mut Vec<usize>) {
        for (i, node) in nodes.iter().enumerate() {
            let ContentNode::Element(element) = node else {
                continue;
            };
            prefix.push(i);
            if let Some(id) = &element.id {
                self.paths
                    .entry(id.clone())
                    .or_insert_with(|| Path(prefix.clone()));
            }
            self.visit(element.children(), prefix);
            prefix.pop();
        }
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.paths.get(id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Turn `#fragment` hrefs that name a known id into `ref` paths.
///
/// Resolved hrefs are removed from `attrs`; unresolved ones stay. Returns
/// the number of links resolved.
pub fn resolve_references(forest: &mut [ContentNode], index: &IdIndex) -> usize {
    let mut resolved = 0;
    for node in forest.iter_mut() {
        let Some(element) = node.as_element_mut() else {
            continue;
        };

        let target = element
            .attr("href")
            .and_then(|href| href.strip_prefix('#'))
            .and_then(|fragment| index.get(fragment))
            .cloned();
        if let Some(path) = target {
            element.reference = Some(path);
            if let Some(attrs) = element.attrs.as_mut() {
                attrs.remove("href");
                if attrs.is_empty() {
                    element.attrs = None;
                }
            }
            resolved += 1;
        }

        if let Some(children) = element.children.as_mut() {
            resolved += resolve_references(children, index);
        }
    }
    resolved
}
