//! Tree addresses.
//!
//! A [`Path`] is the list of child indices leading from the forest root to a
//! node. Its string form joins the indices with dashes: `[2, 0, 5]` is
//! `"2-0-5"`, and the empty path is `""`.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address of a node in a content forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<usize>);

/// A path string had a component that is not a plain decimal index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path component {0:?}")]
pub struct PathParseError(pub String);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse the dash-separated form. Any non-numeric component gives `None`.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('-')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(PathParseError(part.to_string()));
                }
                part.parse::<usize>()
                    .map_err(|_| PathParseError(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

/// Half-open range between two paths. `end: None` runs to the end of the forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Path>,
}

impl Range {
    pub fn new(start: Path, end: Option<Path>) -> Self {
        Self { start, end }
    }

    /// Range from `start` to the end of the forest.
    pub fn starting_at(start: Path) -> Self {
        Self { start, end: None }
    }
}
