//! Data paths into the reactive store
//!
//! A [`DataPath`] is a list of field and index keys, displayed dotted
//! (`todos.0.done`). The first key names a top-level field of the store.

use smallvec::SmallVec;
use std::fmt;

/// One step of a data path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Field(String),
    Index(usize),
}

impl PathKey {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathKey::Field(name) => Some(name),
            PathKey::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(index) => Some(*index),
            PathKey::Field(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Field(name) => f.write_str(name),
            PathKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathKey {
    /// Purely numeric segments become indices.
    fn from(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = segment.parse() {
                return PathKey::Index(index);
            }
        }
        PathKey::Field(segment.to_string())
    }
}

impl From<String> for PathKey {
    fn from(segment: String) -> Self {
        PathKey::from(segment.as_str())
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

/// A path from a top-level store field down to a nested value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DataPath {
    keys: SmallVec<[PathKey; 4]>,
}

impl DataPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dotted path. Empty segments are skipped.
    pub fn parse(dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(PathKey::from)
            .collect()
    }

    /// The top-level field this path starts at.
    pub fn field(&self) -> Option<&str> {
        self.keys.first().and_then(PathKey::as_field)
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn push(&mut self, key: impl Into<PathKey>) {
        self.keys.push(key.into());
    }

    /// A new path one key deeper.
    pub fn child(&self, key: impl Into<PathKey>) -> Self {
        let mut child = self.clone();
        child.push(key);
        child
    }

    pub fn join(&self, rest: &[PathKey]) -> Self {
        let mut joined = self.clone();
        joined.keys.extend(rest.iter().cloned());
        joined
    }

    pub fn split_first(&self) -> Option<(&PathKey, &[PathKey])> {
        self.keys.split_first()
    }

    pub fn starts_with(&self, prefix: &DataPath) -> bool {
        self.keys.starts_with(&prefix.keys)
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathKey> for DataPath {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl From<&str> for DataPath {
    fn from(dotted: &str) -> Self {
        DataPath::parse(dotted)
    }
}

impl From<PathKey> for DataPath {
    fn from(key: PathKey) -> Self {
        std::iter::once(key).collect()
    }
}
