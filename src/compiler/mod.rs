//! XHTML section to content tree compiler.
//!
//! A section is parsed into an [`ArenaDom`](crate::dom::ArenaDom), its head
//! stylesheets are assembled, and the body is transformed into one content
//! element with cascade-resolved styles.
//!
//! # Example
//!
//! ```
//! use quire::compiler::transform_section;
//! use quire::css::Stylesheet;
//! use quire::diagnostics::Diagnostics;
//! use quire::dom::parse_xml;
//!
//! let mut diagnostics = Diagnostics::new();
//! let dom = parse_xml("<html><body><p id='x'>Hi</p></body></html>", &mut diagnostics);
//! let sheet = Stylesheet::parse("p { text-align: center }", &mut diagnostics);
//!
//! let body = transform_section(&dom, &sheet, "ch1.xhtml").unwrap();
//! assert_eq!(body.id.as_deref(), Some("ch1.xhtml"));
//! ```

mod head;
mod transform;

pub use head::{StyleSource, collect_style_sources, load_stylesheet};
pub use transform::transform_section;

use crate::diagnostics::Diagnostics;
use crate::dom::parse_xml;
use crate::epub::{Package, SpineEntry};
use crate::error::Result;
use crate::model::Element;

/// Load, style and transform one spine entry.
///
/// Read failures and a missing `<body>` are returned as errors; everything
/// recoverable is reported to `diagnostics`.
pub async fn compile_section(
    package: &Package,
    entry: &SpineEntry,
    media_types: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<Element> {
    let markup = package.load_section(entry).await?;
    let dom = parse_xml(&markup, diagnostics);
    let stylesheet = load_stylesheet(package, &dom, &entry.file, media_types, diagnostics).await;

    log::debug!(
        "Compiling {} ({} nodes, {} rules)",
        entry.file,
        dom.len(),
        stylesheet.rules.len()
    );
    transform_section(&dom, &stylesheet, &entry.file)
}
