//! Selector model, parsing and matching.
//!
//! Supported grammar: `*`, element names, `.class`, `#id`, `:pseudo` and
//! `::pseudo` atoms, compounds of atoms, descendant combinators (whitespace)
//! and comma-separated lists. Attribute selectors and the `>`, `+`, `~`
//! combinators are rejected with a [`SelectorError`].

use std::cmp::Ordering;
use std::fmt;

use cssparser::{Delimiter, ParseError, ParseErrorKind, Parser, ParserInput, Token};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::element_ref::ElementRef;

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Universal,
    Element(String),
    Class(String),
    Id(String),
    /// Pseudo-class or pseudo-element, stored with its leading colon(s).
    /// Never matches.
    Pseudo(String),
    And(Vec<Selector>),
    Descendant {
        ancestor: Box<Selector>,
        descendant: Box<Selector>,
    },
    Or(Vec<Selector>),
}

/// Why a selector alternative was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("unsupported combinator '{0}'")]
    UnsupportedCombinator(char),

    #[error("attribute selectors are not supported")]
    AttributeSelector,

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("empty selector")]
    Empty,
}

/// CSS specificity for cascade ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub elements: u32,
}

impl Specificity {
    pub fn new(ids: u32, classes: u32, elements: u32) -> Self {
        Self {
            ids,
            classes,
            elements,
        }
    }
}

impl std::ops::Add for Specificity {
    type Output = Specificity;

    fn add(self, other: Self) -> Self {
        Self {
            ids: self.ids + other.ids,
            classes: self.classes + other.classes,
            elements: self.elements + other.elements,
        }
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ids
            .cmp(&other.ids)
            .then(self.classes.cmp(&other.classes))
            .then(self.elements.cmp(&other.elements))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// CSS2 pseudo-elements that may be written with a single colon.
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

impl Selector {
    /// Parse a selector list. Multiple alternatives become [`Selector::Or`].
    ///
    /// Fails on the first bad alternative; use [`parse_selector_list`] to
    /// keep the usable ones.
    pub fn parse(text: &str) -> Result<Selector, SelectorError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut alternatives = Vec::new();
        for alternative in parse_selector_list(&mut parser) {
            alternatives.push(alternative.result?);
        }
        match alternatives.len() {
            0 => Err(SelectorError::Empty),
            1 => Ok(alternatives.remove(0)),
            _ => Ok(Selector::Or(alternatives)),
        }
    }

    /// Specificity of this selector. For [`Selector::Or`] this is the
    /// highest alternative.
    pub fn specificity(&self) -> Specificity {
        match self {
            Selector::Universal => Specificity::default(),
            Selector::Element(_) => Specificity::new(0, 0, 1),
            Selector::Class(_) => Specificity::new(0, 1, 0),
            Selector::Id(_) => Specificity::new(1, 0, 0),
            Selector::Pseudo(name) => {
                if is_pseudo_element(name) {
                    Specificity::new(0, 0, 1)
                } else {
                    Specificity::new(0, 1, 0)
                }
            }
            Selector::And(parts) => parts
                .iter()
                .map(Selector::specificity)
                .fold(Specificity::default(), |acc, s| acc + s),
            Selector::Descendant {
                ancestor,
                descendant,
            } => ancestor.specificity() + descendant.specificity(),
            Selector::Or(alternatives) => alternatives
                .iter()
                .map(Selector::specificity)
                .max()
                .unwrap_or_default(),
        }
    }

    /// Test whether this selector matches an element.
    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        match self {
            Selector::Universal => true,
            Selector::Element(name) => element
                .local_name()
                .is_some_and(|local| local.eq_ignore_ascii_case(name)),
            Selector::Class(class) => element.has_class(class),
            Selector::Id(id) => element.id() == Some(id.as_str()),
            Selector::Pseudo(_) => false,
            Selector::And(parts) => parts.iter().all(|part| part.matches(element)),
            Selector::Descendant {
                ancestor,
                descendant,
            } => {
                if !descendant.matches(element) {
                    return false;
                }
                let mut current = element.parent_element();
                while let Some(parent) = current {
                    if ancestor.matches(parent) {
                        return true;
                    }
                    current = parent.parent_element();
                }
                false
            }
            Selector::Or(alternatives) => alternatives.iter().any(|alt| alt.matches(element)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Universal => f.write_str("*"),
            Selector::Element(name) => f.write_str(name),
            Selector::Class(class) => write!(f, ".{class}"),
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Pseudo(name) => f.write_str(name),
            Selector::And(parts) => parts.iter().try_for_each(|part| write!(f, "{part}")),
            Selector::Descendant {
                ancestor,
                descendant,
            } => write!(f, "{ancestor} {descendant}"),
            Selector::Or(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
        }
    }
}

fn is_pseudo_element(name: &str) -> bool {
    if name.starts_with("::") {
        return true;
    }
    let bare = name.trim_start_matches(':');
    LEGACY_PSEUDO_ELEMENTS
        .iter()
        .any(|legacy| legacy.eq_ignore_ascii_case(bare))
}

/// One comma-separated alternative of a selector list.
#[derive(Debug)]
pub struct ParsedAlternative {
    /// Source text of the alternative, trimmed.
    pub text: String,
    pub result: Result<Selector, SelectorError>,
}

/// Parse every alternative of a selector list independently.
pub fn parse_selector_list(input: &mut Parser<'_, '_>) -> Vec<ParsedAlternative> {
    let mut alternatives = Vec::new();
    loop {
        let start = input.position();
        let result: Result<Selector, ParseError<'_, SelectorError>> =
            input.parse_until_before(Delimiter::Comma, |alt| {
                parse_alternative(alt).map_err(|e| alt.new_custom_error(e))
            });
        let text = input.slice_from(start).trim().to_string();
        let result = result.map_err(|e| match e.kind {
            ParseErrorKind::Custom(err) => err,
            ParseErrorKind::Basic(basic) => SelectorError::UnexpectedToken(format!("{basic:?}")),
        });
        alternatives.push(ParsedAlternative { text, result });

        match input.next() {
            Ok(Token::Comma) => continue,
            _ => break,
        }
    }
    alternatives
}

fn parse_alternative(input: &mut Parser<'_, '_>) -> Result<Selector, SelectorError> {
    let mut chain: Vec<Selector> = Vec::new();
    let mut compound: Vec<Selector> = Vec::new();
    let mut pending_descendant = false;

    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        if matches!(token, Token::WhiteSpace(_)) {
            if !compound.is_empty() {
                pending_descendant = true;
            }
            continue;
        }

        if pending_descendant {
            chain.push(finish_compound(std::mem::take(&mut compound)));
            pending_descendant = false;
        }

        match token {
            Token::Ident(name) => {
                // A type selector can only start a compound.
                if !compound.is_empty() {
                    return Err(SelectorError::UnexpectedToken(name.to_string()));
                }
                compound.push(Selector::Element(name.to_ascii_lowercase()));
            }
            Token::Delim('*') => {
                if !compound.is_empty() {
                    return Err(SelectorError::UnexpectedToken("*".to_string()));
                }
                compound.push(Selector::Universal);
            }
            Token::Delim('.') => match input.next_including_whitespace() {
                Ok(Token::Ident(class)) => compound.push(Selector::Class(class.to_string())),
                Ok(other) => return Err(SelectorError::UnexpectedToken(format!("{other:?}"))),
                Err(_) => return Err(SelectorError::UnexpectedToken(".".to_string())),
            },
            Token::IDHash(id) => compound.push(Selector::Id(id.to_string())),
            Token::Colon => compound.push(parse_pseudo(input)?),
            Token::Delim(c @ ('>' | '+' | '~')) => {
                return Err(SelectorError::UnsupportedCombinator(c));
            }
            Token::SquareBracketBlock => return Err(SelectorError::AttributeSelector),
            other => return Err(SelectorError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    if !compound.is_empty() {
        chain.push(finish_compound(compound));
    }

    let mut parts = chain.into_iter();
    let first = parts.next().ok_or(SelectorError::Empty)?;
    Ok(parts.fold(first, |ancestor, descendant| Selector::Descendant {
        ancestor: Box::new(ancestor),
        descendant: Box::new(descendant),
    }))
}

/// Parse the remainder of a pseudo selector after its first colon.
fn parse_pseudo(input: &mut Parser<'_, '_>) -> Result<Selector, SelectorError> {
    let mut prefix = ":";
    loop {
        match input.next_including_whitespace() {
            Ok(Token::Colon) if prefix == ":" => prefix = "::",
            // Function arguments are skipped with the block on the next read.
            Ok(Token::Ident(name)) | Ok(Token::Function(name)) => {
                return Ok(Selector::Pseudo(format!(
                    "{prefix}{}",
                    name.to_ascii_lowercase()
                )));
            }
            Ok(other) => return Err(SelectorError::UnexpectedToken(format!("{other:?}"))),
            Err(_) => return Err(SelectorError::UnexpectedToken(prefix.to_string())),
        }
    }
}

fn finish_compound(mut atoms: Vec<Selector>) -> Selector {
    if atoms.len() == 1 {
        atoms.remove(0)
    } else {
        Selector::And(atoms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::dom::parse_xml;

    #[test]
    fn test_parse_atoms() {
        assert_eq!(Selector::parse("*").unwrap(), Selector::Universal);
        assert_eq!(
            Selector::parse("P").unwrap(),
            Selector::Element("p".to_string())
        );
        assert_eq!(
            Selector::parse(".Note").unwrap(),
            Selector::Class("Note".to_string())
        );
        assert_eq!(
            Selector::parse("#main").unwrap(),
            Selector::Id("main".to_string())
        );
        assert_eq!(
            Selector::parse("a:hover").unwrap(),
            Selector::And(vec![
                Selector::Element("a".to_string()),
                Selector::Pseudo(":hover".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_descendant_chain() {
        let selector = Selector::parse("div .note  p").unwrap();
        assert_eq!(selector.to_string(), "div .note p");
        match selector {
            Selector::Descendant { ancestor, descendant } => {
                assert_eq!(*descendant, Selector::Element("p".to_string()));
                assert!(matches!(*ancestor, Selector::Descendant { .. }));
            }
            other => panic!("expected descendant, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list() {
        let selector = Selector::parse("h1, h2.title").unwrap();
        match selector {
            Selector::Or(alternatives) => assert_eq!(alternatives.len(), 2),
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_syntax() {
        assert_eq!(
            Selector::parse("div > p"),
            Err(SelectorError::UnsupportedCombinator('>'))
        );
        assert_eq!(
            Selector::parse("h1 + p"),
            Err(SelectorError::UnsupportedCombinator('+'))
        );
        assert_eq!(
            Selector::parse("a[href]"),
            Err(SelectorError::AttributeSelector)
        );
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
    }

    #[test]
    fn test_list_keeps_good_alternatives() {
        let mut input = ParserInput::new("p, div > p, .x");
        let mut parser = Parser::new(&mut input);
        let alternatives = parse_selector_list(&mut parser);
        assert_eq!(alternatives.len(), 3);
        assert!(alternatives[0].result.is_ok());
        assert_eq!(alternatives[1].text, "div > p");
        assert!(alternatives[1].result.is_err());
        assert!(alternatives[2].result.is_ok());
    }

    #[test]
    fn test_specificity() {
        let weight = |s: &str| Selector::parse(s).unwrap().specificity();
        assert_eq!(weight("*"), Specificity::new(0, 0, 0));
        assert_eq!(weight("p"), Specificity::new(0, 0, 1));
        assert_eq!(weight("p.a.b"), Specificity::new(0, 2, 1));
        assert_eq!(weight("#x p"), Specificity::new(1, 0, 1));
        assert_eq!(weight("a:hover"), Specificity::new(0, 1, 1));
        assert_eq!(weight("p::first-line"), Specificity::new(0, 0, 2));
        assert_eq!(weight("p:before"), Specificity::new(0, 0, 2));
        assert!(weight("#x") > weight(".a.b.c"));
        assert!(weight(".a") > weight("div p span"));
    }

    #[test]
    fn test_matching() {
        let mut diagnostics = Diagnostics::new();
        let dom = parse_xml(
            r#"<html><body><div id="main" class="box"><p class="note">x</p></div></body></html>"#,
            &mut diagnostics,
        );
        let p = dom.find_by_tag("p").unwrap();
        let element = ElementRef::new(&dom, p);

        let matches = |s: &str| Selector::parse(s).unwrap().matches(element);
        assert!(matches("p"));
        assert!(matches("P"));
        assert!(matches("*"));
        assert!(matches(".note"));
        assert!(matches("p.note"));
        assert!(matches("#main p"));
        assert!(matches("body .note"));
        assert!(matches("html div p"));
        assert!(matches("span, p"));
        assert!(!matches("div.note"));
        assert!(!matches("#other p"));
        assert!(!matches("p:first-child"));
        assert!(!matches("p p"));
    }

    #[test]
    fn test_pseudo_function_skips_arguments() {
        let selector = Selector::parse("p:not(.a), li").unwrap();
        assert_eq!(
            selector,
            Selector::Or(vec![
                Selector::And(vec![
                    Selector::Element("p".to_string()),
                    Selector::Pseudo(":not".to_string()),
                ]),
                Selector::Element("li".to_string()),
            ])
        );
    }
}
