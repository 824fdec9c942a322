//! XHTML section markup as an index-addressed arena.

mod arena;
mod builder;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, ChildrenIter, local_name};
pub use builder::parse_xml;
pub(crate) use builder::{attribute_value, resolve_entity};
