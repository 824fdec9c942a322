//! Lengths, positions and range extraction over a content forest.
//!
//! Text length is counted in Unicode scalar values. An element's length is
//! the sum of its children, a stub's is the length it stands for.

use super::node::{ContentNode, Element};
use super::path::{Path, Range};

/// Text length of a node.
pub fn length(node: &ContentNode) -> usize {
    match node {
        ContentNode::Text { text } => text.chars().count(),
        ContentNode::Stub { length } => *length,
        ContentNode::Element(element) => forest_length(element.children()),
    }
}

/// Total text length of a forest.
pub fn forest_length(nodes: &[ContentNode]) -> usize {
    nodes.iter().map(length).sum()
}

/// Text length preceding the node at `path`.
///
/// Indices past the end of a child list count every sibling at that level.
pub fn position_for_path(forest: &[ContentNode], path: &Path) -> usize {
    let mut position = 0;
    let mut siblings = forest;

    for &index in path.iter() {
        position += forest_length(&siblings[..index.min(siblings.len())]);
        match siblings.get(index) {
            Some(node) => siblings = node.children(),
            None => break,
        }
    }

    position
}

/// Path of the first element (pre-order) whose id is `id`.
pub fn find_path_for_id(forest: &[ContentNode], id: &str) -> Option<Path> {
    fn search(nodes: &[ContentNode], id: &str, prefix: &mut Vec<usize>) -> bool {
        for (index, node) in nodes.iter().enumerate() {
            prefix.push(index);
            if let ContentNode::Element(element) = node
                && (element.id.as_deref() == Some(id) || search(element.children(), id, prefix))
            {
                return true;
            }
            prefix.pop();
        }
        false
    }

    let mut prefix = Vec::new();
    search(forest, id, &mut prefix).then(|| Path(prefix))
}

/// Restrict a forest to a half-open range.
///
/// The result has the same shape at the top level and the same total length:
/// nodes fully outside the range become stubs, nodes straddling a boundary
/// are narrowed recursively, nodes fully inside are kept.
pub fn nodes_for_range(forest: &[ContentNode], range: &Range) -> Vec<ContentNode> {
    narrow_forest(forest, &range.start, range.end.as_deref())
}

fn narrow_forest(nodes: &[ContentNode], start: &[usize], end: Option<&[usize]>) -> Vec<ContentNode> {
    let (s, start_tail) = match start.split_first() {
        Some((first, rest)) => (*first, rest),
        None => (0, &[][..]),
    };
    let (e, end_tail) = match end {
        // The range ends where this list begins
        Some([]) => return nodes.iter().map(stub).collect(),
        Some([first, rest @ ..]) => (Some(*first), Some(rest)),
        None => (None, None),
    };

    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| match e {
            Some(e) if e < s => stub(node),
            _ if i < s => stub(node),
            Some(e) if i == s && e == s => narrow_node(node, start_tail, end_tail),
            _ if i == s => narrow_node(node, start_tail, None),
            Some(e) if i < e => node.clone(),
            Some(e) if i == e => narrow_node(node, &[], end_tail),
            Some(_) => stub(node),
            None => node.clone(),
        })
        .collect()
}

fn narrow_node(node: &ContentNode, start: &[usize], end: Option<&[usize]>) -> ContentNode {
    if end == Some(&[]) {
        return stub(node);
    }
    match node {
        ContentNode::Element(element) if element.children.is_some() => {
            ContentNode::Element(Element {
                children: Some(narrow_forest(element.children(), start, end)),
                ..element.clone_without_children()
            })
        }
        _ => node.clone(),
    }
}

fn stub(node: &ContentNode) -> ContentNode {
    ContentNode::Stub {
        length: length(node),
    }
}

impl Element {
    fn clone_without_children(&self) -> Element {
        Element {
            tag: self.tag.clone(),
            id: self.id.clone(),
            style: self.style.clone(),
            children: None,
            attrs: self.attrs.clone(),
            file: self.file.clone(),
            reference: self.reference.clone(),
            paragraph: self.paragraph,
        }
    }
}

/// Text of every leaf inside the range, concatenated.
pub fn text_for_range(forest: &[ContentNode], range: &Range) -> String {
    let narrowed = nodes_for_range(forest, range);
    let mut text = String::new();
    for (_, leaf) in Leaves::new(&narrowed) {
        if let ContentNode::Text { text: t } = leaf {
            text.push_str(t);
        }
    }
    text
}

/// Preview text starting at the node addressed by `path`.
///
/// Leaf text is collected in document order from the first leaf at or after
/// `path` until the trimmed text is at least `length` characters long, or
/// the forest ends. The trimmed text is returned as is.
pub fn preview_for_path(forest: &[ContentNode], path: &Path, length: usize) -> String {
    let mut preview = String::new();
    for (leaf_path, leaf) in Leaves::new(forest) {
        if leaf_path.as_slice() < &path[..] {
            continue;
        }
        if let ContentNode::Text { text } = leaf {
            preview.push_str(text);
            if preview.trim().chars().count() >= length {
                break;
            }
        }
    }
    preview.trim().to_string()
}

/// Depth-first iterator over the leaves of a forest with their paths.
///
/// Elements without children count as leaves.
struct Leaves<'a> {
    stack: Vec<(&'a [ContentNode], usize)>,
}

impl<'a> Leaves<'a> {
    fn new(forest: &'a [ContentNode]) -> Self {
        Self {
            stack: vec![(forest, 0)],
        }
    }

    fn current_path(&self) -> Vec<usize> {
        self.stack.iter().map(|(_, index)| *index).collect()
    }
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Vec<usize>, &'a ContentNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (siblings, index) = *self.stack.last()?;
            let Some(node) = siblings.get(index) else {
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.1 += 1;
                }
                continue;
            };

            let children = node.children();
            if children.is_empty() {
                let path = self.current_path();
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                return Some((path, node));
            }
            self.stack.push((children, 0));
        }
    }
}
