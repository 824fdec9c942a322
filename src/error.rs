//! Error types for quire operations.
//!
//! These never cross the public pipeline boundary as-is: `parse_document` and
//! `extract_metadata` fold them into [`Diagnostic`](crate::Diagnostic)s.

use thiserror::Error;

/// Errors that can occur while reading an EPUB into a document model.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("No package found")]
    NoPackage,

    #[error("Section {0} has no <body>")]
    MissingBody(String),

    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
