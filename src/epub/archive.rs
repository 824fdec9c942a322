//! Archive access behind an async seam.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding, strip_bom};

/// Read access to the files of an EPUB container.
///
/// Paths are archive paths (`OEBPS/text/ch1.xhtml`). A missing entry is
/// `Ok(None)`; `Err` means the entry exists but could not be read.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    async fn read_text(&self, path: &str) -> Result<Option<String>>;

    async fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// [`ArchiveReader`] over an in-memory zip file.
pub struct ZipArchiveReader {
    archive: Mutex<ZipArchive<Cursor<Arc<[u8]>>>>,
}

impl ZipArchiveReader {
    /// Open the zip central directory. Fails on a corrupt archive.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes.into()))?;
        Ok(Self {
            archive: Mutex::new(archive),
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ZipArchive<Cursor<Arc<[u8]>>>> {
        self.archive.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = self.lock();

        // Try direct lookup first
        match read_entry(&mut archive, path) {
            Ok(Some(contents)) => return Ok(Some(contents)),
            Ok(None) => {}
            Err(e) => return Err(e),
        }

        // Fallback: try percent-decoded path (handles malformed EPUBs)
        let decoded = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {path}")))?;
        if decoded == path {
            return Ok(None);
        }
        read_entry(&mut archive, &decoded)
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<Arc<[u8]>>>,
    path: &str,
) -> Result<Option<Vec<u8>>> {
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            Ok(Some(contents))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ArchiveReader for ZipArchiveReader {
    async fn read_text(&self, path: &str) -> Result<Option<String>> {
        Ok(self.read_bytes(path)?.map(|bytes| {
            let bytes = strip_bom(&bytes);
            decode_text(bytes, extract_xml_encoding(bytes)).into_owned()
        }))
    }

    async fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.read_bytes(path)
    }
}
