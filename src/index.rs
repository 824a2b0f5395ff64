// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::quote::{quote, unquote};

/// Canonical path representation: an ordered sequence of components.
///
/// The empty sequence denotes the root of the backed-up tree. Indices
/// order lexicographically component by component, which is the order
/// every log is written in, so range and prefix scans are linear.
///
/// On the wire an index appears as a single token: the literal `.` for
/// the root, otherwise the quoted components joined with `/`. Slashes
/// are left unquoted, so splitting a token on `/` yields the components
/// directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathIndex(Vec<Vec<u8>>);

impl PathIndex {
    /// The empty index, denoting the root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Builds an index from path components.
    #[must_use]
    pub fn new(components: Vec<Vec<u8>>) -> Self {
        Self(components)
    }

    /// The path components, in order.
    #[must_use]
    pub fn components(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// Returns `true` for the root index.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `prefix` is a component-wise prefix of this index.
    ///
    /// Every index extends the root.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }

    /// Encodes the index as a single quoted filename token.
    #[must_use]
    pub fn to_token(&self) -> Vec<u8> {
        if self.is_root() {
            return b".".to_vec();
        }

        let quoted = self.0.iter().map(|c| quote(c)).collect::<Vec<_>>();
        quoted.join(&b"/"[..])
    }

    /// Decodes a quoted filename token back into an index.
    #[must_use]
    pub fn from_token(token: &[u8]) -> Self {
        if token == b"." {
            return Self::root();
        }

        Self(
            unquote(token)
                .split(|byte| *byte == b'/')
                .map(<[u8]>::to_vec)
                .collect(),
        )
    }
}

impl std::fmt::Display for PathIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }

        let mut first = true;

        for component in &self.0 {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{}", String::from_utf8_lossy(component))?;
            first = false;
        }

        Ok(())
    }
}

impl<S: AsRef<[u8]>, const N: usize> From<[S; N]> for PathIndex {
    fn from(components: [S; N]) -> Self {
        Self(components.iter().map(|c| c.as_ref().to_vec()).collect())
    }
}

impl<S: AsRef<[u8]>> FromIterator<S> for PathIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|c| c.as_ref().to_vec()).collect())
    }
}
