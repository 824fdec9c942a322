//! Document assembly from an opened package.
//!
//! Sections are compiled in spine order and concatenated into one forest.
//! Links, paragraphs and the table of contents are then resolved against the
//! completed forest, so sections are never processed in parallel.

mod images;
mod links;
mod metadata;
mod paragraphs;
mod toc;

pub use images::{collect_image_sources, fetch_images};
pub use links::{IdIndex, resolve_references};
pub use metadata::build_metadata;
pub use paragraphs::mark_paragraphs;
pub use toc::build_toc;

use std::collections::BTreeMap;

use crate::compiler::compile_section;
use crate::diagnostics::Diagnostics;
use crate::epub::Package;
use crate::error::Error;
use crate::model::{ContentNode, Document};
use crate::options::ParseOptions;

/// Build the full document for a package.
///
/// A section that cannot be read or has no `<body>` is skipped with a
/// warning; the rest of the book is still assembled.
pub async fn assemble_document(
    package: &Package,
    options: &ParseOptions,
    diagnostics: &mut Diagnostics,
) -> Document {
    let mut content: Vec<ContentNode> = Vec::with_capacity(package.spine.len());
    for entry in &package.spine {
        match compile_section(package, entry, &options.media_types, diagnostics).await {
            Ok(body) => content.push(body.into()),
            Err(Error::MissingBody(file)) => {
                diagnostics.warn(format!("Section {file} has no <body>, skipped"));
            }
            Err(e) => diagnostics.warn(format!("Failed to load section {}: {e}", entry.file)),
        }
    }

    let index = IdIndex::build(&content);
    let resolved = resolve_references(&mut content, &index);
    mark_paragraphs(&mut content);
    log::debug!(
        "Assembled {} sections, {} ids, {} links resolved",
        content.len(),
        index.len(),
        resolved
    );

    let toc = build_toc(package.toc(diagnostics).await, &content, &index, diagnostics);
    let metadata = build_metadata(&package.metadata, package.cover_href.as_deref(), diagnostics);

    let images = if options.collect_images {
        let cover = package
            .cover_href
            .as_deref()
            .filter(|_| options.include_cover_image);
        let sources = collect_image_sources(&content, cover);
        fetch_images(package, &sources, diagnostics).await
    } else {
        BTreeMap::new()
    };

    Document {
        content,
        metadata,
        toc,
        images,
        cover: package.cover_href.clone(),
    }
}
