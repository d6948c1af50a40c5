//! Dotted keys addressing entries of a tree.

use std::fmt;

/// A parsed tree key.
///
/// Components are separated by `.` (the template convention, `R.urlbase`) or
/// `/` (the URL convention, `R/urlbase`). Empty components are ignored, so
/// `"a..b"`, `".a.b."` and `"a/b"` all address the same entry. The empty key
/// addresses the root.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Key {
    pub components: Vec<String>,
}

impl Key {
    /// Parse a key string. Parsing never fails; any string is a valid key.
    pub fn parse(s: &str) -> Self {
        Key {
            components: s
                .split(['.', '/'])
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// A key with a single component, taken verbatim (dots are not split).
    pub fn single(component: impl Into<String>) -> Self {
        Key {
            components: vec![component.into()],
        }
    }

    /// Check if this key addresses the root.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// Split into the parent key and the last component.
    pub fn split_last(&self) -> Option<(&[String], &String)> {
        let (last, parent) = self.components.split_last()?;
        Some((parent, last))
    }

    /// Join this key with another.
    #[must_use]
    pub fn join(&self, other: &Key) -> Key {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Key { components }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::parse(s)
    }
}
