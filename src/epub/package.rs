//! An opened OPF package: metadata, manifest, spine and href resolution.

use std::sync::Arc;

use super::archive::ArchiveReader;
use super::parser::{
    ManifestItem, MetadataFields, NavDocument, OpfData, RawTocItem, parse_nav, parse_ncx,
    parse_opf,
};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::util::resolve_href;

/// A spine entry resolved through the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    pub id: String,
    /// Package-relative file name.
    pub file: String,
    pub media_type: String,
    pub linear: bool,
}

/// Table of contents entry with its href resolved to a package-relative file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    /// `file` or `file#fragment`, package-relative and percent-decoded.
    pub href: Option<String>,
}

/// Table of contents entries plus the document title they carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageToc {
    pub title: Option<String>,
    pub entries: Vec<TocEntry>,
}

/// An opened OPF package.
pub struct Package {
    /// Archive path of the OPF file.
    pub path: String,
    /// Directory of the OPF file, `""` at the archive root.
    pub base: String,
    pub metadata: MetadataFields,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineEntry>,
    /// Package-relative cover image href.
    pub cover_href: Option<String>,
    ncx: Option<String>,
    nav: Option<String>,
    reader: Arc<dyn ArchiveReader>,
}

impl Package {
    /// Read and parse the OPF at `opf_path`.
    pub async fn open(
        reader: Arc<dyn ArchiveReader>,
        opf_path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let content = reader
            .read_text(opf_path)
            .await?
            .ok_or_else(|| Error::MissingEntry(opf_path.to_string()))?;
        let opf = parse_opf(&content)?;

        let base = match opf_path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };

        let spine = resolve_spine(&opf, diagnostics);
        let cover_href = opf.cover_href().map(str::to_string);
        let ncx = opf.ncx_item().map(|i| i.href.clone());
        let nav = opf.nav_item().map(|i| i.href.clone());
        let OpfData {
            metadata, manifest, ..
        } = opf;

        Ok(Self {
            path: opf_path.to_string(),
            base,
            metadata,
            manifest,
            spine,
            cover_href,
            ncx,
            nav,
            reader,
        })
    }

    /// Archive path for a package-relative file name.
    pub fn archive_path(&self, file: &str) -> String {
        if self.base.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.base, file)
        }
    }

    /// Read a package-relative file as text.
    pub async fn read_text(&self, file: &str) -> Result<Option<String>> {
        self.reader.read_text(&self.archive_path(file)).await
    }

    /// Read a package-relative file as bytes.
    pub async fn read_binary(&self, file: &str) -> Result<Option<Vec<u8>>> {
        self.reader.read_binary(&self.archive_path(file)).await
    }

    /// Load the markup of a spine entry.
    pub async fn load_section(&self, entry: &SpineEntry) -> Result<String> {
        self.read_text(&entry.file)
            .await?
            .ok_or_else(|| Error::MissingEntry(entry.file.clone()))
    }

    /// Flattened table of contents: NCX first, EPUB 3 nav document as fallback.
    pub async fn toc(&self, diagnostics: &mut Diagnostics) -> PackageToc {
        if let Some(ncx) = &self.ncx {
            match self.read_text(ncx).await {
                Ok(Some(content)) => match parse_ncx(&content) {
                    Ok(nav) if !nav.items.is_empty() => return resolve_toc(ncx, nav),
                    Ok(_) => {}
                    Err(e) => diagnostics.warn(format!("Failed to parse NCX {ncx}: {e}")),
                },
                Ok(None) => diagnostics.warn(format!("NCX {ncx} not found in archive")),
                Err(e) => diagnostics.warn(format!("Archive read error for {ncx}: {e}")),
            }
        }

        if let Some(nav) = &self.nav {
            match self.read_text(nav).await {
                Ok(Some(content)) => return resolve_toc(nav, parse_nav(&content, diagnostics)),
                Ok(None) => diagnostics.warn(format!("Navigation document {nav} not found")),
                Err(e) => diagnostics.warn(format!("Archive read error for {nav}: {e}")),
            }
        }

        PackageToc::default()
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("path", &self.path)
            .field("spine", &self.spine.len())
            .field("manifest", &self.manifest.len())
            .finish()
    }
}

fn resolve_spine(opf: &OpfData, diagnostics: &mut Diagnostics) -> Vec<SpineEntry> {
    opf.spine
        .iter()
        .filter_map(|itemref| match opf.manifest_item(&itemref.idref) {
            Some(item) => Some(SpineEntry {
                id: item.id.clone(),
                file: item.href.clone(),
                media_type: item.media_type.clone(),
                linear: itemref.linear,
            }),
            None => {
                diagnostics.warn(format!(
                    "Spine item {} is not in the manifest",
                    itemref.idref
                ));
                None
            }
        })
        .collect()
}

/// Resolve toc hrefs against the toc document so they are package-relative.
fn resolve_toc(toc_file: &str, nav: NavDocument) -> PackageToc {
    PackageToc {
        title: nav.title,
        entries: nav
            .items
            .into_iter()
            .map(|RawTocItem { level, title, href }| TocEntry {
                level,
                title,
                href: href.map(|h| resolve_href(toc_file, &h)),
            })
            .collect(),
    }
}
