//! EPUB container and package reading.

mod archive;
mod package;
pub mod parser;

pub use archive::{ArchiveReader, ZipArchiveReader};
pub use package::{Package, PackageToc, SpineEntry, TocEntry};
pub use parser::{ManifestItem, MetadataFields, MetadataValue};

use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

/// Location of the container document inside every EPUB.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Open every package listed in `META-INF/container.xml`.
///
/// Rootfiles that fail to open are reported and skipped; `Error::NoPackage`
/// is returned when none is usable.
pub async fn open_packages(
    reader: Arc<dyn ArchiveReader>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Package>> {
    let container = match reader.read_text(CONTAINER_PATH).await {
        Ok(Some(container)) => container,
        Ok(None) => return Err(Error::NoPackage),
        Err(e) => {
            diagnostics.warn(format!("Archive read error for {CONTAINER_PATH}: {e}"));
            return Err(Error::NoPackage);
        }
    };

    let rootfiles = match parser::parse_container(&container) {
        Ok(rootfiles) => rootfiles,
        Err(e) => {
            diagnostics.warn(format!("Malformed {CONTAINER_PATH}: {e}"));
            return Err(Error::NoPackage);
        }
    };

    let mut packages = Vec::new();
    for path in rootfiles {
        match Package::open(reader.clone(), &path, diagnostics).await {
            Ok(package) => {
                log::debug!(
                    "Opened package {} ({} spine items)",
                    package.path,
                    package.spine.len()
                );
                packages.push(package);
            }
            Err(e) => diagnostics.warn(format!("Failed to open package {path}: {e}")),
        }
    }

    if packages.is_empty() {
        return Err(Error::NoPackage);
    }
    Ok(packages)
}
