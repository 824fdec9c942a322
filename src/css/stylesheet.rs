//! Stylesheet parsing with cssparser.
//!
//! Parsing is lenient: every rule or selector that cannot be used is dropped,
//! and anything not silently ignorable is reported to the diagnostics sink.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};
use serde::{Deserialize, Serialize};

use super::selector::{Selector, Specificity, parse_selector_list};
use crate::diagnostics::Diagnostics;

/// Media types applied when the caller does not configure any.
pub const DEFAULT_MEDIA_TYPES: &[&str] = &["all", "screen"];

/// Media types whose rules are dropped without a diagnostic.
const IGNORED_MEDIA_TYPES: &[&str] = &["print", "speech"];

/// A parsed CSS stylesheet.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

/// A CSS rule with its usable selector alternatives and declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssRule {
    pub selectors: Vec<RuleSelector>,
    pub declarations: Vec<Declaration>,
}

/// One selector alternative of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSelector {
    pub selector: Selector,
    pub specificity: Specificity,
}

/// A CSS declaration (property: value), value kept as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Stylesheet {
    /// Parse a stylesheet using the default media types.
    pub fn parse(css: &str, diagnostics: &mut Diagnostics) -> Self {
        let media: Vec<String> = DEFAULT_MEDIA_TYPES.iter().map(|m| m.to_string()).collect();
        Self::parse_for_media(css, &media, diagnostics)
    }

    /// Parse a stylesheet, keeping `@media` blocks that target `media_types`.
    pub fn parse_for_media(
        css: &str,
        media_types: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Self {
        // cssparser swallows a leading @charset, so check it here.
        if let Some(charset) = leading_charset(css)
            && !is_utf8_label(&charset)
        {
            diagnostics.warn(format!("Unsupported @charset \"{charset}\""));
        }

        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        let mut rule_parser = TopLevelRuleParser {
            rules: &mut rules,
            diagnostics,
            media_types,
        };
        let stylesheet_parser = StyleSheetParser::new(&mut parser, &mut rule_parser);

        for result in stylesheet_parser {
            // Errors are reported where they are detected
            let _ = result;
        }

        Self { rules }
    }

    /// Append every rule of `other` after this sheet's rules.
    pub fn append(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }

    /// Check if the stylesheet is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parse a declaration list, as found in a `style` attribute.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };

    for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
        let _ = result;
    }

    declarations
}

/// Parser for top-level stylesheet rules.
struct TopLevelRuleParser<'a> {
    rules: &'a mut Vec<CssRule>,
    diagnostics: &'a mut Diagnostics,
    media_types: &'a [String],
}

/// What an at-rule prelude turned out to be.
enum AtRulePrelude {
    /// `@font-face`, `@page`: dropped silently.
    Ignored,
    Media(MediaVerdict, String),
    Charset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaVerdict {
    Apply,
    Skip,
    Unsupported,
}

impl<'i> AtRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = AtRulePrelude;
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        classify_at_rule(&name, input, start, self)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        match prelude {
            AtRulePrelude::Ignored => Ok(()),
            AtRulePrelude::Media(MediaVerdict::Apply, _) => {
                for result in StyleSheetParser::new(input, self) {
                    let _ = result;
                }
                Ok(())
            }
            AtRulePrelude::Media(MediaVerdict::Skip, _) => Ok(()),
            AtRulePrelude::Media(MediaVerdict::Unsupported, query) => {
                self.diagnostics
                    .warn(format!("Unsupported media query \"{query}\""));
                Ok(())
            }
            AtRulePrelude::Charset(_) => Err(input.new_custom_error(())),
        }
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        match prelude {
            AtRulePrelude::Charset(charset) => {
                if !is_utf8_label(&charset) {
                    self.diagnostics
                        .warn(format!("Unsupported @charset \"{charset}\""));
                }
                Ok(())
            }
            AtRulePrelude::Ignored => Ok(()),
            AtRulePrelude::Media(MediaVerdict::Unsupported, query) => {
                self.diagnostics
                    .warn(format!("Unsupported media query \"{query}\""));
                Ok(())
            }
            // Nothing to apply without a block
            AtRulePrelude::Media(..) => Ok(()),
        }
    }
}

/// Classify an at-rule by name. Unknown at-rules are reported and rejected.
fn classify_at_rule<'i>(
    name: &str,
    input: &mut Parser<'i, '_>,
    start: cssparser::SourcePosition,
    parser: &mut TopLevelRuleParser<'_>,
) -> Result<AtRulePrelude, ParseError<'i, ()>> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "font-face" | "page" => {
            while input.next().is_ok() {}
            Ok(AtRulePrelude::Ignored)
        }
        "media" => {
            while input.next().is_ok() {}
            let query = input.slice_from(start).trim().to_string();
            let verdict = evaluate_media(&query, parser.media_types);
            Ok(AtRulePrelude::Media(verdict, query))
        }
        "charset" => {
            let charset = input.expect_string_cloned()?;
            Ok(AtRulePrelude::Charset(charset.to_string()))
        }
        _ => {
            parser
                .diagnostics
                .warn(format!("Unsupported at-rule @{name}"));
            Err(input.new_custom_error(()))
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = Vec<RuleSelector>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let mut selectors = Vec::new();
        for alternative in parse_selector_list(input) {
            match alternative.result {
                Ok(selector) => {
                    let specificity = selector.specificity();
                    selectors.push(RuleSelector {
                        selector,
                        specificity,
                    });
                }
                Err(e) => self.diagnostics.warn_with(
                    format!("Unsupported selector \"{}\": {e}", alternative.text),
                    serde_json::json!({ "selector": alternative.text }),
                ),
            }
        }

        if selectors.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut declarations = Vec::new();
        let mut decl_parser = DeclarationListParser {
            declarations: &mut declarations,
        };

        for result in RuleBodyParser::new(input, &mut decl_parser) {
            // Ignore errors - lenient parsing
            let _ = result;
        }

        self.rules.push(CssRule {
            selectors: prelude,
            declarations,
        });

        Ok(())
    }
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        let value = strip_important(input.slice_from(start).trim());

        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }

        self.declarations.push(Declaration {
            property: name.to_ascii_lowercase(),
            value: value.to_string(),
        });

        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Remove a trailing `!important` flag from a raw value.
fn strip_important(value: &str) -> &str {
    if let Some(bang) = value.rfind('!')
        && value[bang + 1..].trim().eq_ignore_ascii_case("important")
    {
        return value[..bang].trim_end();
    }
    value
}

/// Decide what to do with an `@media` block from its query list.
fn evaluate_media(query: &str, media_types: &[String]) -> MediaVerdict {
    let mut all_ignored = true;

    for single in query.split(',') {
        let lower = single.trim().to_ascii_lowercase();
        let mut words = lower.split_whitespace();
        let mut media_type = words.next().unwrap_or("");
        if media_type == "only" {
            media_type = words.next().unwrap_or("");
        }
        let has_conditions = words.next().is_some();

        if !has_conditions && media_types.iter().any(|m| m.eq_ignore_ascii_case(media_type)) {
            return MediaVerdict::Apply;
        }
        if !IGNORED_MEDIA_TYPES.contains(&media_type) {
            all_ignored = false;
        }
    }

    if all_ignored {
        MediaVerdict::Skip
    } else {
        MediaVerdict::Unsupported
    }
}

/// Charset named by a leading `@charset "...";` rule, if any.
fn leading_charset(css: &str) -> Option<String> {
    let rest = css.trim_start_matches('\u{feff}').strip_prefix("@charset")?;
    let rest = rest.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    Some(value[..end].to_string())
}

fn is_utf8_label(charset: &str) -> bool {
    matches!(charset.trim().to_ascii_lowercase().as_str(), "utf-8" | "utf8")
}
