//! # quire
//!
//! Turns EPUB archives into a normalized, addressable document model.
//!
//! ## Features
//!
//! - Lenient EPUB 2/3 reading: container, OPF package, NCX and nav documents
//! - XHTML sections compiled to a content tree with cascade-resolved CSS
//! - Document-wide ids, internal links resolved to tree paths
//! - Table of contents, metadata and base64 images
//! - Path and range utilities for previews and partial rendering
//!
//! Nothing here fails hard on a damaged book: problems are collected as
//! [`Diagnostic`]s next to the result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quire::{ParseOptions, parse_document};
//!
//! # async fn run() {
//! let bytes = std::fs::read("book.epub").unwrap();
//! let outcome = parse_document(bytes, &ParseOptions::default()).await;
//!
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{}", diagnostic.message);
//! }
//! if let Some(document) = outcome.document {
//!     println!("{:?}: {} sections", document.metadata.title, document.content.len());
//! }
//! # }
//! ```
//!
//! ## Working with the content tree
//!
//! ```
//! use quire::model::{ContentNode, Element, Path, Range, length, nodes_for_range};
//!
//! let forest: Vec<ContentNode> = vec![
//!     Element::new("p").with_children(vec![ContentNode::text("Hello")]).into(),
//!     Element::new("p").with_children(vec![ContentNode::text("World")]).into(),
//! ];
//!
//! let range = Range::starting_at(Path::parse("1").unwrap());
//! let narrowed = nodes_for_range(&forest, &range);
//! assert!(narrowed[0].is_stub());
//! assert_eq!(length(&narrowed[0]), 5);
//! ```

pub mod cache;
pub mod compiler;
pub mod css;
pub mod diagnostics;
pub mod dom;
pub mod epub;
pub mod error;
pub mod import;
pub mod model;
pub mod options;
pub(crate) mod util;

pub use cache::{BookCache, parse_document_cached};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use model::{ContentNode, Document, Element, Metadata, Path, Range, TableOfContents};
pub use options::{MetadataOptions, ParseOptions};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use epub::{ArchiveReader, Package, ZipArchiveReader, open_packages};

/// Result of [`parse_document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    /// `None` when the archive is unusable or parsing hit an internal fault.
    pub document: Option<Document>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of [`extract_metadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataOutcome {
    pub metadata: Option<Metadata>,
    pub cover_base64: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse an EPUB into a [`Document`].
///
/// Only a corrupt archive, a book without a usable package, or an internal
/// panic produce `document: None`; each adds one error diagnostic.
pub async fn parse_document(bytes: impl Into<Arc<[u8]>>, options: &ParseOptions) -> ParseOutcome {
    let bytes = bytes.into();
    parse_with(move || open_zip(bytes), options).await
}

/// Parse a book served by any [`ArchiveReader`], with the same guarantees as
/// [`parse_document`].
pub async fn parse_document_from_reader(
    reader: Arc<dyn ArchiveReader>,
    options: &ParseOptions,
) -> ParseOutcome {
    parse_with(move || Ok(reader), options).await
}

async fn parse_with(
    open: impl FnOnce() -> Result<Arc<dyn ArchiveReader>>,
    options: &ParseOptions,
) -> ParseOutcome {
    let mut diagnostics = Diagnostics::new();

    let result = AssertUnwindSafe(parse_package(open, options, &mut diagnostics))
        .catch_unwind()
        .await;
    let document = match result {
        Ok(Ok(document)) => Some(document),
        Ok(Err(e)) => {
            diagnostics.error(format!("Could not parse document: {e}"));
            None
        }
        Err(panic) => {
            diagnostics.error(format!(
                "Internal error while parsing document: {}",
                panic_message(&*panic)
            ));
            None
        }
    };

    ParseOutcome {
        document,
        diagnostics: diagnostics.into_vec(),
    }
}

async fn parse_package(
    open: impl FnOnce() -> Result<Arc<dyn ArchiveReader>>,
    options: &ParseOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Document> {
    let package = open_first_package(open()?, diagnostics).await?;
    Ok(import::assemble_document(&package, options, diagnostics).await)
}

/// Read only the package metadata, and optionally the cover image.
///
/// Sections are not parsed.
pub async fn extract_metadata(
    bytes: impl Into<Arc<[u8]>>,
    options: &MetadataOptions,
) -> MetadataOutcome {
    let bytes = bytes.into();
    extract_with(move || open_zip(bytes), options).await
}

/// [`extract_metadata`] over any [`ArchiveReader`].
pub async fn extract_metadata_from_reader(
    reader: Arc<dyn ArchiveReader>,
    options: &MetadataOptions,
) -> MetadataOutcome {
    extract_with(move || Ok(reader), options).await
}

async fn extract_with(
    open: impl FnOnce() -> Result<Arc<dyn ArchiveReader>>,
    options: &MetadataOptions,
) -> MetadataOutcome {
    let mut diagnostics = Diagnostics::new();

    let result = AssertUnwindSafe(read_metadata(open, options, &mut diagnostics))
        .catch_unwind()
        .await;
    let (metadata, cover_base64) = match result {
        Ok(Ok((metadata, cover))) => (Some(metadata), cover),
        Ok(Err(e)) => {
            diagnostics.error(format!("Could not read metadata: {e}"));
            (None, None)
        }
        Err(panic) => {
            diagnostics.error(format!(
                "Internal error while reading metadata: {}",
                panic_message(&*panic)
            ));
            (None, None)
        }
    };

    MetadataOutcome {
        metadata,
        cover_base64,
        diagnostics: diagnostics.into_vec(),
    }
}

async fn read_metadata(
    open: impl FnOnce() -> Result<Arc<dyn ArchiveReader>>,
    options: &MetadataOptions,
    diagnostics: &mut Diagnostics,
) -> Result<(Metadata, Option<String>)> {
    let package = open_first_package(open()?, diagnostics).await?;
    let metadata = import::build_metadata(
        &package.metadata,
        package.cover_href.as_deref(),
        diagnostics,
    );

    let cover = match (&package.cover_href, options.extract_cover) {
        (Some(href), true) => match package.read_binary(href).await {
            Ok(Some(bytes)) => Some(STANDARD.encode(bytes)),
            Ok(None) => {
                diagnostics.warn(format!("Cover image {href} not found in archive"));
                None
            }
            Err(e) => {
                diagnostics.warn(format!("Archive read error for {href}: {e}"));
                None
            }
        },
        _ => None,
    };

    Ok((metadata, cover))
}

fn open_zip(bytes: Arc<[u8]>) -> Result<Arc<dyn ArchiveReader>> {
    Ok(Arc::new(ZipArchiveReader::new(bytes)?))
}

/// First package listed in the container.
async fn open_first_package(
    reader: Arc<dyn ArchiveReader>,
    diagnostics: &mut Diagnostics,
) -> Result<Package> {
    let packages = open_packages(reader, diagnostics).await?;
    if packages.len() > 1 {
        diagnostics.info(format!(
            "{} packages found, using {}",
            packages.len(),
            packages[0].path
        ));
    }
    packages.into_iter().next().ok_or(Error::NoPackage)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
