//! Element handle for selector matching against an [`ArenaDom`].

use crate::dom::{ArenaDom, ArenaNodeId};

/// Wrapper for an element reference with DOM access.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    pub dom: &'a ArenaDom,
    pub id: ArenaNodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(dom: &'a ArenaDom, id: ArenaNodeId) -> Self {
        Self { dom, id }
    }

    /// Local name with any namespace prefix removed.
    pub fn local_name(&self) -> Option<&'a str> {
        self.dom.local_name(self.id)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.dom.element_id(self.id)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.dom.element_classes(self.id).iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.dom.get_attr(self.id, name)
    }

    pub fn parent_element(&self) -> Option<Self> {
        self.dom
            .parent_element(self.id)
            .map(|id| Self::new(self.dom, id))
    }
}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.dom.element_name(self.id))
            .finish()
    }
}
