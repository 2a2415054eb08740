//! Materialized paths locating a post inside its thread's reply tree.
//!
//! A [`PostPath`] is the sequence of sibling indexes leading from a root post
//! down to the post itself. Comparing two paths component by component yields
//! the depth-first (pre-order) position of the posts, and a path is an
//! ancestor of another exactly when it is a proper prefix of it.
//!
//! Storage keeps the path as text. Every component is written as a fixed-width
//! block of lowercase hex digits so that plain byte-wise string comparison in
//! the database agrees with the numeric ordering defined here: `2` encodes as
//! `00000002` and sorts before `10` (`0000000a`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index assigned to the first child of a parent (or the first root post).
pub const BASE_INDEX: u32 = 1;

/// Number of hex digits used for each encoded component.
pub const COMPONENT_WIDTH: usize = 8;

/// Failure to decode a stored path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathDecodeError {
    /// The stored value held no components.
    #[error("empty post path")]
    Empty,
    /// The stored value was not a whole number of components.
    #[error("post path length {0} is not a multiple of {COMPONENT_WIDTH}")]
    Length(usize),
    /// A component was not valid hex.
    #[error("invalid post path component {0:?}")]
    Component(String),
}

/// Position of a post in its thread's reply tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostPath(Vec<u32>);

impl PostPath {
    /// Path of a top-level post with the given sibling index.
    #[must_use]
    pub fn root(index: u32) -> Self { Self(vec![index]) }

    /// Path of a direct child of `self` with the given sibling index.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut components = Vec::with_capacity(self.0.len() + 1);
        components.extend_from_slice(&self.0);
        components.push(index);
        Self(components)
    }

    /// Sibling indexes from the root down to this post.
    #[must_use]
    pub fn components(&self) -> &[u32] { &self.0 }

    /// Number of components; a root post has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize { self.0.len() }

    /// Sibling index of the top-level ancestor.
    #[must_use]
    pub fn root_index(&self) -> Option<u32> { self.0.first().copied() }

    /// This post's own sibling index.
    #[must_use]
    pub fn local_index(&self) -> Option<u32> { self.0.last().copied() }

    /// Path of the parent post, or `None` for a root post.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self(rest.to_vec())),
            _ => None,
        }
    }

    /// Whether `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Encode into the order-preserving text stored in the database.
    #[must_use]
    pub fn encode(&self) -> String {
        use fmt::Write as _;

        let mut out = String::with_capacity(self.0.len() * COMPONENT_WIDTH);
        for component in &self.0 {
            // Writing into a String cannot fail.
            let _ = write!(out, "{component:08x}");
        }
        out
    }

    /// Decode text previously produced by [`PostPath::encode`].
    ///
    /// # Errors
    /// Returns [`PathDecodeError`] when the text is empty, truncated, or holds
    /// non-hex characters.
    pub fn decode(encoded: &str) -> Result<Self, PathDecodeError> {
        if encoded.is_empty() {
            return Err(PathDecodeError::Empty);
        }
        let bytes = encoded.as_bytes();
        if bytes.len() % COMPONENT_WIDTH != 0 {
            return Err(PathDecodeError::Length(bytes.len()));
        }
        bytes
            .chunks(COMPONENT_WIDTH)
            .map(|chunk| {
                let text = std::str::from_utf8(chunk)
                    .map_err(|_| PathDecodeError::Component(String::from_utf8_lossy(chunk).into_owned()))?;
                u32::from_str_radix(text, 16).map_err(|_| PathDecodeError::Component(text.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for PostPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for PostPath {
    type Err = PathDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::decode(s) }
}
