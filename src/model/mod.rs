//! Document model.
//!
//! This module contains:
//! - Content nodes (elements, text, stubs)
//! - Paths and ranges addressing nodes in a content forest
//! - Length, position and range utilities
//! - The assembled document with its metadata and table of contents

mod document;
mod node;
mod path;
mod position;

pub use document::{Document, Metadata, TableOfContents, Tag, TocItem};
pub use node::{ContentNode, Element};
pub use path::{Path, PathParseError, Range};
pub use position::{
    find_path_for_id, forest_length, length, nodes_for_range, position_for_path,
    preview_for_path, text_for_range,
};
