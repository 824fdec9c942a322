//! Table of contents resolution.

use serde_json::json;

use super::links::IdIndex;
use crate::diagnostics::Diagnostics;
use crate::epub::PackageToc;
use crate::model::{ContentNode, TableOfContents, TocItem, position_for_path};
use crate::util::split_fragment;

/// Resolve package toc entries to paths in the forest.
///
/// Entries without an href are headings only and are skipped. Entries whose
/// target is not in the index are dropped with one warning each.
pub fn build_toc(
    toc: PackageToc,
    forest: &[ContentNode],
    index: &IdIndex,
    diagnostics: &mut Diagnostics,
) -> TableOfContents {
    let mut items = Vec::new();

    for entry in toc.entries {
        let Some(href) = entry.href else {
            continue;
        };
        let id = match split_fragment(&href) {
            (file, Some(fragment)) if !fragment.is_empty() => format!("{file}/{fragment}"),
            (file, _) => file.to_string(),
        };
        match index.get(&id) {
            Some(path) => items.push(TocItem {
                title: entry.title,
                level: entry.level,
                position: position_for_path(forest, path),
                path: path.clone(),
            }),
            None => diagnostics.warn_with(
                format!("Table of contents entry {:?} points nowhere", entry.title),
                json!({ "href": href }),
            ),
        }
    }

    TableOfContents {
        title: toc.title.unwrap_or_default(),
        items,
    }
}
