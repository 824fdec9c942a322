//! EPUB parsing utilities (container.xml, OPF, NCX, nav document)

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::diagnostics::Diagnostics;
use crate::dom::{ArenaDom, ArenaNodeId, attribute_value, local_name, parse_xml, resolve_entity};
use crate::error::{Error, Result};

/// One value of a package metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataValue {
    pub text: String,
    /// `opf:event` / `event` attribute (mostly on `dc:date`).
    pub event: Option<String>,
}

/// Package metadata fields in document order, grouped by key as written
/// (`dc:title`, `dc:creator`, an EPUB 3 meta `property`, an EPUB 2 meta `name`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    fields: Vec<(String, Vec<MetadataValue>)>,
}

impl MetadataFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; the key keeps the position of its first occurrence.
    pub fn push(&mut self, key: impl Into<String>, value: MetadataValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((key, vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[MetadataValue]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetadataValue])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A manifest `<item>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Package-relative, percent-decoded.
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// A spine `<itemref>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItemRef {
    pub idref: String,
    pub linear: bool,
}

/// Parsed OPF package data.
#[derive(Debug, Clone, Default)]
pub struct OpfData {
    pub metadata: MetadataFields,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItemRef>,
    /// `toc` attribute of `<spine>`.
    pub toc_id: Option<String>,
    /// Manifest id named by `<meta name="cover" content="...">`.
    pub cover_id: Option<String>,
}

impl OpfData {
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Cover image href: `cover-image` property, then the EPUB 2 cover meta,
    /// then an image item with id `cover`.
    pub fn cover_href(&self) -> Option<&str> {
        if let Some(item) = self.manifest.iter().find(|i| i.has_property("cover-image")) {
            return Some(&item.href);
        }
        if let Some(item) = self
            .cover_id
            .as_deref()
            .and_then(|id| self.manifest_item(id))
        {
            return Some(&item.href);
        }
        self.manifest
            .iter()
            .find(|i| i.id == "cover" && i.is_image())
            .map(|i| i.href.as_str())
    }

    /// The NCX document: the spine's `toc` item, else any NCX in the manifest.
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.toc_id
            .as_deref()
            .and_then(|id| self.manifest_item(id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|i| i.media_type == "application/x-dtbncx+xml")
            })
    }

    /// The EPUB 3 navigation document.
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|i| i.has_property("nav"))
    }
}

/// A flattened table of contents entry as found in the toc document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTocItem {
    /// Nesting depth, 0 at the top.
    pub level: usize,
    pub title: String,
    /// Href relative to the toc document, as written.
    pub href: Option<String>,
}

/// Table of contents read from an NCX or nav document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavDocument {
    pub title: Option<String>,
    pub items: Vec<RawTocItem>,
}

/// Parse META-INF/container.xml into the list of rootfile paths.
pub fn parse_container(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut rootfiles = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name_bytes(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr(&e, b"full-path")
                    && !path.is_empty()
                {
                    rootfiles.push(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(rootfiles)
}

/// Parse an OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    // Text is split around entity references; trim once the value is complete.
    reader.config_mut().trim_text(false);

    let mut opf = OpfData::default();
    let mut in_metadata = false;
    // (key, event) of the metadata element whose text is being collected
    let mut current: Option<(String, Option<String>)> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name_bytes(name.as_ref());
                match local {
                    b"metadata" => in_metadata = true,
                    // OPF 2.0 legacy grouping elements
                    b"dc-metadata" | b"x-metadata" => {}
                    b"spine" => opf.toc_id = attr(&e, b"toc"),
                    b"item" => push_manifest_item(&mut opf, &e),
                    b"itemref" => push_itemref(&mut opf, &e),
                    _ if in_metadata => {
                        if !push_named_meta(&mut opf, &e) {
                            current = metadata_key(&e);
                            buf_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name_bytes(name.as_ref()) {
                    b"item" => push_manifest_item(&mut opf, &e),
                    b"itemref" => push_itemref(&mut opf, &e),
                    b"meta" if in_metadata => {
                        push_named_meta(&mut opf, &e);
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if local_name_bytes(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some((key, event)) = current.take() {
                    let text = buf_text.trim();
                    if !text.is_empty() {
                        opf.metadata.push(
                            key,
                            MetadataValue {
                                text: text.to_string(),
                                event,
                            },
                        );
                    }
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(opf)
}

/// Record an EPUB 2 `<meta name="..." content="..."/>`. Returns false for
/// any other element.
fn push_named_meta(opf: &mut OpfData, e: &BytesStart<'_>) -> bool {
    if local_name_bytes(e.name().as_ref()) != b"meta" {
        return false;
    }
    let (Some(name), Some(content)) = (attr(e, b"name"), attr(e, b"content")) else {
        return false;
    };
    if name == "cover" {
        opf.cover_id = Some(content.clone());
    }
    opf.metadata.push(
        name,
        MetadataValue {
            text: content,
            event: None,
        },
    );
    true
}

/// Key and event for a metadata element, or `None` for elements that
/// refine other entries.
fn metadata_key(e: &BytesStart<'_>) -> Option<(String, Option<String>)> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut event = None;
    let mut property = None;
    let mut refines = false;

    for a in e.attributes().with_checks(false).flatten() {
        match local_name_bytes(a.key.as_ref()) {
            b"event" => event = Some(attribute_value(&a.value)),
            b"property" => property = Some(attribute_value(&a.value)),
            b"refines" => refines = true,
            _ => {}
        }
    }

    if local_name(&name) == "meta" {
        // EPUB 3: <meta property="...">text</meta>
        if refines {
            return None;
        }
        return property.map(|p| (p, None));
    }
    Some((name, event))
}

fn push_manifest_item(opf: &mut OpfData, e: &BytesStart<'_>) {
    let (Some(id), Some(href)) = (attr(e, b"id"), attr(e, b"href")) else {
        return;
    };
    opf.manifest.push(ManifestItem {
        id,
        href: crate::util::percent_decode(&href).into_owned(),
        media_type: attr(e, b"media-type").unwrap_or_default(),
        properties: attr(e, b"properties")
            .map(|p| p.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    });
}

fn push_itemref(opf: &mut OpfData, e: &BytesStart<'_>) {
    if let Some(idref) = attr(e, b"idref") {
        let linear = attr(e, b"linear").is_none_or(|l| l != "no");
        opf.spine.push(SpineItemRef { idref, linear });
    }
}

/// Parse an NCX document into flattened, depth-first toc items.
pub fn parse_ncx(content: &str) -> Result<NavDocument> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut nav = NavDocument::default();
    // Indices into nav.items of the open navPoints
    let mut stack: Vec<usize> = Vec::new();
    let mut in_doc_title = false;
    let mut in_text = false;
    let mut doc_title = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name_bytes(e.name().as_ref()) {
                b"navPoint" => {
                    nav.items.push(RawTocItem {
                        level: stack.len(),
                        title: String::new(),
                        href: None,
                    });
                    stack.push(nav.items.len() - 1);
                }
                b"docTitle" => in_doc_title = true,
                b"text" => in_text = true,
                b"content" => set_ncx_src(&mut nav, &stack, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name_bytes(e.name().as_ref()) == b"content" {
                    set_ncx_src(&mut nav, &stack, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    push_ncx_text(&mut nav, &stack, in_doc_title, &mut doc_title, &raw);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        push_ncx_text(&mut nav, &stack, in_doc_title, &mut doc_title, &resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name_bytes(e.name().as_ref()) {
                b"navPoint" => {
                    stack.pop();
                }
                b"docTitle" => in_doc_title = false,
                b"text" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    for item in &mut nav.items {
        item.title = collapse_whitespace(&item.title);
    }
    let doc_title = collapse_whitespace(&doc_title);
    if !doc_title.is_empty() {
        nav.title = Some(doc_title);
    }

    Ok(nav)
}

fn set_ncx_src(nav: &mut NavDocument, stack: &[usize], e: &BytesStart<'_>) {
    if let Some(&index) = stack.last()
        && let Some(src) = attr(e, b"src")
    {
        nav.items[index].href = Some(src);
    }
}

fn push_ncx_text(
    nav: &mut NavDocument,
    stack: &[usize],
    in_doc_title: bool,
    doc_title: &mut String,
    text: &str,
) {
    if in_doc_title {
        doc_title.push_str(text);
    } else if let Some(&index) = stack.last() {
        nav.items[index].title.push_str(text);
    }
}

/// Parse an EPUB 3 navigation document (`nav[epub:type~=toc]`).
pub fn parse_nav(content: &str, diagnostics: &mut Diagnostics) -> NavDocument {
    let dom = parse_xml(content, diagnostics);
    let mut nav = NavDocument::default();

    let Some(toc) = dom.find(|node| match &node.data {
        crate::dom::ArenaNodeData::Element { name, attrs, .. } => {
            local_name(name) == "nav"
                && attrs.iter().any(|a| {
                    local_name(&a.name) == "type" && a.value.split_whitespace().any(|t| t == "toc")
                })
        }
        _ => false,
    }) else {
        return nav;
    };

    for child in dom.children(toc) {
        match dom.local_name(child) {
            Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6") if nav.title.is_none() => {
                let title = collapse_whitespace(&dom.collect_text(child));
                if !title.is_empty() {
                    nav.title = Some(title);
                }
            }
            Some("ol" | "ul") => collect_nav_list(&dom, child, 0, &mut nav.items),
            _ => {}
        }
    }

    nav
}

fn collect_nav_list(dom: &ArenaDom, list: ArenaNodeId, level: usize, items: &mut Vec<RawTocItem>) {
    for li in dom.children(list) {
        if dom.local_name(li) != Some("li") {
            continue;
        }
        for child in dom.children(li) {
            match dom.local_name(child) {
                Some("a") => items.push(RawTocItem {
                    level,
                    title: collapse_whitespace(&dom.collect_text(child)),
                    href: dom.get_attr(child, "href").map(str::to_string),
                }),
                Some("span") => items.push(RawTocItem {
                    level,
                    title: collapse_whitespace(&dom.collect_text(child)),
                    href: None,
                }),
                Some("ol" | "ul") => collect_nav_list(dom, child, level + 1, items),
                _ => {}
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name_bytes(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Decoded value of an attribute, matched by exact qualified name.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| attribute_value(&a.value))
}
