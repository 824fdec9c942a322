//! Lenient XHTML to [`ArenaDom`] builder on top of quick-xml.
//!
//! Real-world EPUB sections are often not well-formed XML: stray end tags,
//! unclosed `<br>`, HTML entities with no DTD. The builder accepts all of
//! these and never fails. Stray `&` and `<` that cannot start a reference or
//! a tag are escaped before tokenizing so they survive as text; a hard
//! tokenizer error still ends the walk and the partial tree is returned.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};

use super::arena::{ArenaDom, ArenaNodeId, Attribute};
use crate::diagnostics::Diagnostics;

/// HTML elements that never have content, even when written without `/>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Parse an XHTML document into an arena DOM.
pub fn parse_xml(xml: &str, diagnostics: &mut Diagnostics) -> ArenaDom {
    let xml = escape_stray_markup(xml);
    let mut reader = Reader::from_str(&xml);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.expand_empty_elements = false;

    let mut dom = ArenaDom::new();
    // Open elements: (qualified name, node)
    let mut stack: Vec<(String, ArenaNodeId)> = Vec::new();

    loop {
        let parent = stack.last().map(|(_, id)| *id).unwrap_or(dom.document());
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (name, attrs) = element_parts(&e, diagnostics);
                let is_void = is_void_element(&name);
                let node = dom.create_element(name.clone(), attrs);
                dom.append(parent, node);
                if !is_void {
                    stack.push((name, node));
                }
            }
            Ok(Event::Empty(e)) => {
                let (name, attrs) = element_parts(&e, diagnostics);
                let node = dom.create_element(name, attrs);
                dom.append(parent, node);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                // Close back to the nearest matching open element; stray ends are ignored.
                if let Some(pos) = stack
                    .iter()
                    .rposition(|(open, _)| open.eq_ignore_ascii_case(&name))
                {
                    stack.truncate(pos);
                }
            }
            Ok(Event::Text(e)) => {
                let text = String::from_utf8_lossy(e.as_ref());
                if !text.is_empty() {
                    dom.append_text(parent, &text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                if !text.is_empty() {
                    dom.append_text(parent, &text);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                match resolve_entity(&entity) {
                    Some(resolved) => dom.append_text(parent, &resolved),
                    None => dom.append_text(parent, &format!("&{entity};")),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                diagnostics.warn_with(
                    format!("Malformed XML, document truncated: {e}"),
                    serde_json::json!({ "position": reader.buffer_position() }),
                );
                break;
            }
            // Comments, processing instructions, doctype, declaration
            Ok(_) => {}
        }
    }

    dom
}

/// Name and attributes of a start tag. HTML attribute rules apply, so
/// unquoted and valueless attributes are kept.
fn element_parts(e: &BytesStart<'_>, diagnostics: &mut Diagnostics) -> (String, Vec<Attribute>) {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.html_attributes().with_checks(false) {
        match attr {
            Ok(attr) => attrs.push(Attribute {
                name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value: attribute_value(&attr.value),
            }),
            Err(err) => {
                diagnostics.warn(format!("Unreadable attribute on <{name}> dropped: {err}"));
                break;
            }
        }
    }
    (name, attrs)
}

/// Escape `&` and `<` that cannot start a reference or a tag. Comments and
/// CDATA sections are copied unchanged.
fn escape_stray_markup(xml: &str) -> Cow<'_, str> {
    let bytes = xml.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if xml[i..].starts_with("<!--") => i = skip_past(xml, i, "-->"),
            b'<' if xml[i..].starts_with("<![CDATA[") => i = skip_past(xml, i, "]]>"),
            b'<' if !starts_tag(&xml[i + 1..]) => {
                out.push_str(&xml[copied..i]);
                out.push_str("&lt;");
                i += 1;
                copied = i;
            }
            b'&' if !starts_reference(&xml[i + 1..]) => {
                out.push_str(&xml[copied..i]);
                out.push_str("&amp;");
                i += 1;
                copied = i;
            }
            _ => i += 1,
        }
    }
    if copied == 0 {
        return Cow::Borrowed(xml);
    }
    out.push_str(&xml[copied..]);
    Cow::Owned(out)
}

fn skip_past(xml: &str, from: usize, terminator: &str) -> usize {
    xml[from..]
        .find(terminator)
        .map_or(xml.len(), |pos| from + pos + terminator.len())
}

fn starts_tag(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || matches!(c, '_' | ':' | '/' | '!' | '?'))
}

/// Whether `rest` (the text after `&`) begins with `name;`, `#n;` or `#xh;`.
fn starts_reference(rest: &str) -> bool {
    let Some(end) = rest.bytes().take(32).position(|b| b == b';') else {
        return false;
    };
    let name = &rest[..end];
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit())
    } else if let Some(dec) = name.strip_prefix('#') {
        !dec.is_empty() && dec.bytes().all(|b| b.is_ascii_digit())
    } else {
        name.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
            && name.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

/// Decode a raw attribute value, resolving entities. Unparseable values are kept raw.
pub(crate) fn attribute_value(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    unescape_with(&raw, named_entity)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn is_void_element(name: &str) -> bool {
    let local = super::arena::local_name(name);
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(local))
}

/// Resolve a general entity reference (without `&`/`;`).
pub(crate) fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string());
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string());
    }
    named_entity(entity).map(str::to_string)
}

/// XML predefined entities plus the HTML ones common in ebooks.
fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "sbquo" => "\u{201a}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bdquo" => "\u{201e}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "lsaquo" => "\u{2039}",
        "rsaquo" => "\u{203a}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "sect" => "\u{a7}",
        "para" => "\u{b6}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{b0}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "frac12" => "\u{bd}",
        "frac14" => "\u{bc}",
        "frac34" => "\u{be}",
        "iexcl" => "\u{a1}",
        "iquest" => "\u{bf}",
        "cent" => "\u{a2}",
        "pound" => "\u{a3}",
        "euro" => "\u{20ac}",
        "yen" => "\u{a5}",
        "eacute" => "\u{e9}",
        "egrave" => "\u{e8}",
        "aacute" => "\u{e1}",
        "agrave" => "\u{e0}",
        "ouml" => "\u{f6}",
        "uuml" => "\u{fc}",
        "auml" => "\u{e4}",
        "szlig" => "\u{df}",
        "ccedil" => "\u{e7}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> (ArenaDom, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let dom = parse_xml(xml, &mut diagnostics);
        (dom, diagnostics)
    }

    #[test]
    fn test_basic_tree() {
        let (dom, diagnostics) =
            parse(r#"<html><body><p id="x" class="a b">Hello</p></body></html>"#);
        assert!(diagnostics.is_empty());

        let p = dom.get_by_id("x").unwrap();
        assert_eq!(dom.element_name(p), Some("p"));
        assert_eq!(dom.element_classes(p).len(), 2);
        assert_eq!(dom.collect_text(p), "Hello");
        let body = dom.find_by_tag("body").unwrap();
        assert_eq!(dom.parent_element(p), Some(body));
    }

    #[test]
    fn test_void_elements_without_close() {
        let (dom, _) = parse("<body><p>a<br>b<img src=\"x.png\"></p><p>c</p></body>");
        let body = dom.find_by_tag("body").unwrap();
        let paragraphs: Vec<_> = dom.children(body).collect();
        assert_eq!(paragraphs.len(), 2);
        let first: Vec<_> = dom.children(paragraphs[0]).collect();
        assert_eq!(first.len(), 4);
        assert_eq!(dom.get_attr(first[3], "src"), Some("x.png"));
    }

    #[test]
    fn test_self_closing_is_leaf() {
        let (dom, _) = parse("<body><div/><p>after</p></body>");
        let body = dom.find_by_tag("body").unwrap();
        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(dom.children(children[0]).count(), 0);
    }

    #[test]
    fn test_mismatched_end_tags() {
        let (dom, _) = parse("<body><div><span>x</div><p>y</p></span></body>");
        let body = dom.find_by_tag("body").unwrap();
        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(dom.local_name(children[1]), Some("p"));
    }

    #[test]
    fn test_entities() {
        let (dom, _) = parse("<p title=\"a&amp;b&nbsp;c\">x &amp; y&mdash;&#65;&#x42;&bogus;</p>");
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.collect_text(p), "x & y\u{2014}AB&bogus;");
        assert_eq!(dom.get_attr(p, "title"), Some("a&b\u{a0}c"));
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let (dom, _) = parse(
            "<?xml version=\"1.0\"?><!DOCTYPE html><html><!-- note --><body>t</body></html>",
        );
        let html = dom.find_by_tag("html").unwrap();
        assert_eq!(dom.children(html).count(), 1);
    }

    #[test]
    fn test_malformed_returns_partial_tree() {
        let (dom, diagnostics) = parse("<body><p>kept</p><p <<<");
        assert_eq!(diagnostics.len(), 1);
        assert!(dom.find_by_tag("body").is_some());
        let body = dom.find_by_tag("body").unwrap();
        assert_eq!(dom.collect_text(body), "kept");
    }

    #[test]
    fn test_stray_ampersand_kept_as_text() {
        let (dom, diagnostics) = parse("<body><p>AT&T rocks</p><p>second &amp; third</p></body>");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let body = dom.find_by_tag("body").unwrap();
        let paragraphs: Vec<_> = dom.children(body).collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(dom.collect_text(paragraphs[0]), "AT&T rocks");
        assert_eq!(dom.collect_text(paragraphs[1]), "second & third");
    }

    #[test]
    fn test_stray_ampersand_in_attribute() {
        let (dom, _) = parse(r#"<p><a href="search?a=1&b=2">q</a></p>"#);
        let a = dom.find_by_tag("a").unwrap();
        assert_eq!(dom.get_attr(a, "href"), Some("search?a=1&b=2"));
    }

    #[test]
    fn test_stray_less_than_kept_as_text() {
        let (dom, diagnostics) = parse("<body><p>a < b</p><p>c</p></body>");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let body = dom.find_by_tag("body").unwrap();
        let paragraphs: Vec<_> = dom.children(body).collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(dom.collect_text(paragraphs[0]), "a < b");
    }

    #[test]
    fn test_cdata_and_comments_untouched() {
        let (dom, _) = parse("<p><!-- a & b --><![CDATA[x & y < z]]></p>");
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.collect_text(p), "x & y < z");
    }

    #[test]
    fn test_unquoted_attributes() {
        let (dom, _) = parse("<body><p class=x id=y>t</p><input disabled></body>");
        let p = dom.get_by_id("y").unwrap();
        assert_eq!(dom.element_classes(p), &["x".to_string()]);
        let input = dom.find_by_tag("input").unwrap();
        assert_eq!(dom.get_attr(input, "disabled"), Some(""));
    }

    #[test]
    fn test_escape_stray_markup_borrows_clean_input() {
        assert!(matches!(
            escape_stray_markup("<p>a &amp; b &#65; &#x42;</p>"),
            Cow::Borrowed(_)
        ));
        assert_eq!(escape_stray_markup("a && b;"), "a &amp;&amp; b;");
        assert_eq!(escape_stray_markup("1 <2"), "1 &lt;2");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp").as_deref(), Some("&"));
        assert_eq!(resolve_entity("#x263A").as_deref(), Some("\u{263a}"));
        assert_eq!(resolve_entity("#8212").as_deref(), Some("\u{2014}"));
        assert_eq!(resolve_entity("nope"), None);
    }
}
