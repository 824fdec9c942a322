//! Text and href helpers shared by the reader, compiler and assembler.

use std::borrow::Cow;
use std::path::{Component, Path};

use percent_encoding::percent_decode_str;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an XML declaration, if any.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Percent-decode an href component, leaving it untouched if it is not UTF-8.
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    percent_decode_str(s)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(s))
}

/// True when the href carries a URI scheme (`http:`, `mailto:`, `data:`, ...).
pub fn has_scheme(href: &str) -> bool {
    let Some(colon) = href.find(':') else {
        return false;
    };
    let scheme = &href[..colon];
    !scheme.is_empty()
        && scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Split an href into its file part and optional fragment.
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((file, fragment)) => (file, Some(fragment)),
        None => (href, None),
    }
}

/// Resolve a relative path against a base file path logically (no filesystem access).
///
/// `../images/photo.jpg` relative to `text/ch1.xhtml` becomes `images/photo.jpg`.
/// A leading `/` is treated as the archive root; hrefs with a scheme are returned as-is.
pub fn resolve_path(base: &str, rel: &str) -> String {
    let rel_path = Path::new(rel);

    if rel_path.has_root() {
        return rel.trim_start_matches('/').to_string();
    }

    if has_scheme(rel) {
        return rel.to_string();
    }

    let mut stack: Vec<&str> = Path::new(base)
        .parent()
        .unwrap_or(Path::new(""))
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    for component in rel_path.components() {
        match component {
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(c) => {
                if let Some(s) = c.to_str() {
                    stack.push(s);
                }
            }
            _ => {}
        }
    }

    stack.join("/")
}

/// Resolve an internal href against the file it appears in.
///
/// The file part is percent-decoded and resolved relative to `base`; an
/// empty file part (`#note`) refers to `base` itself. The fragment is kept.
pub fn resolve_href(base: &str, href: &str) -> String {
    let (file, fragment) = split_fragment(href);
    let file = if file.is_empty() {
        base.to_string()
    } else {
        resolve_path(base, &percent_decode(file))
    };
    match fragment {
        Some(fragment) => format!("{file}#{}", percent_decode(fragment)),
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("text/ch1.xhtml", "ch2.xhtml#sec%201"),
            "text/ch2.xhtml#sec 1"
        );
        assert_eq!(resolve_href("text/ch1.xhtml", "#n1"), "text/ch1.xhtml#n1");
        assert_eq!(
            resolve_href("toc.ncx", "text/chapter%20one.xhtml"),
            "text/chapter one.xhtml"
        );
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_falls_back_to_hint() {
        // "café" in ISO-8859-1
        let bytes = [0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text(&bytes, Some("iso-8859-1")), "café");
        assert_eq!(decode_text(&bytes, None), "café");
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(br#"<?xml version="1.0" encoding="windows-1252"?><a/>"#),
            Some("windows-1252")
        );
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='utf-8'?>"),
            Some("utf-8")
        );
        assert_eq!(extract_xml_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(&[0xEF, 0xBB, 0xBF, b'h', b'i']), b"hi");
        assert_eq!(strip_bom(b"hello"), b"hello");
        assert_eq!(strip_bom(b""), b"");
        let partial = &[0xEF, 0xBB, b'x'];
        assert_eq!(strip_bom(partial), partial);
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com/a.png"));
        assert!(has_scheme("mailto:someone@example.com"));
        assert!(has_scheme("data:image/png;base64,abc"));
        assert!(!has_scheme("chapter1.xhtml#note"));
        assert!(!has_scheme("../images/a:b.png"));
        assert!(!has_scheme("#frag"));
    }

    #[test]
    fn test_split_fragment() {
        assert_eq!(split_fragment("a.xhtml#x"), ("a.xhtml", Some("x")));
        assert_eq!(split_fragment("#x"), ("", Some("x")));
        assert_eq!(split_fragment("a.xhtml"), ("a.xhtml", None));
    }

    #[test]
    fn test_resolve_path_parent_dir() {
        assert_eq!(
            resolve_path("OEBPS/text/ch1.html", "../images/logo.png"),
            "OEBPS/images/logo.png"
        );
    }

    #[test]
    fn test_resolve_path_same_dir() {
        assert_eq!(
            resolve_path("OEBPS/content.html", "images/photo.jpg"),
            "OEBPS/images/photo.jpg"
        );
        assert_eq!(resolve_path("ch1.xhtml", "ch2.xhtml"), "ch2.xhtml");
    }

    #[test]
    fn test_resolve_path_absolute() {
        assert_eq!(
            resolve_path("ch1.html", "/images/absolute.png"),
            "images/absolute.png"
        );
    }

    #[test]
    fn test_resolve_path_multiple_parent() {
        assert_eq!(
            resolve_path("a/b/c/file.html", "../../images/test.png"),
            "a/images/test.png"
        );
    }

    #[test]
    fn test_resolve_path_current_dir() {
        assert_eq!(
            resolve_path("OEBPS/ch1.html", "./images/test.png"),
            "OEBPS/images/test.png"
        );
    }

    #[test]
    fn test_resolve_path_url_passthrough() {
        assert_eq!(
            resolve_path("ch1.html", "https://example.com/image.png"),
            "https://example.com/image.png"
        );
    }
}
