//! CSS engine: stylesheet parsing, selector matching and the cascade.
//!
//! This is not a layout engine. It decides which declarations apply to an
//! element and merges them; values stay as raw CSS text.
//!
//! # Example
//!
//! ```
//! use quire::Diagnostics;
//! use quire::css::{ElementRef, Stylesheet, compute_style};
//! use quire::dom::parse_xml;
//!
//! let mut diagnostics = Diagnostics::new();
//! let sheet = Stylesheet::parse(".intro { font-weight: bold }", &mut diagnostics);
//! let dom = parse_xml(r#"<p id="p1" class="intro">Welcome!</p>"#, &mut diagnostics);
//!
//! let p = dom.get_by_id("p1").unwrap();
//! let style = compute_style(ElementRef::new(&dom, p), &sheet, None).unwrap();
//! assert_eq!(style["font-weight"], "bold");
//! ```

mod cascade;
mod element_ref;
mod selector;
mod stylesheet;

pub use cascade::{StyleMap, compute_style};
pub use element_ref::ElementRef;
pub use selector::{ParsedAlternative, Selector, SelectorError, Specificity, parse_selector_list};
pub use stylesheet::{
    CssRule, DEFAULT_MEDIA_TYPES, Declaration, RuleSelector, Stylesheet, parse_declarations,
};
