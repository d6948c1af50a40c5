//! The ordered, mutable context tree.

use crate::{Key, TreeError, Value};

/// An ordered map of unique keys to values.
///
/// Entries keep their insertion order; replacing an existing entry keeps its
/// position. `Clone` is a full deep copy: no storage is shared between a tree
/// and its clones, which is what lets per-session trees be derived from a
/// global base tree without ever mutating it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    entries: Vec<(String, Value)>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct entry names, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over direct entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// An explicit deep copy. Identical to `clone()`.
    pub fn deep_copy(&self) -> Tree {
        self.clone()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }

    /// Direct entry by name, without key parsing.
    pub fn entry(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    /// Mutable direct entry by name, without key parsing.
    pub fn entry_mut(&mut self, name: &str) -> Option<&mut Value> {
        let i = self.position(name)?;
        Some(&mut self.entries[i].1)
    }

    /// Insert or replace a direct entry. Replacing keeps the entry's position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Get a value by dotted key.
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        let key = key.into();
        let (first, rest) = key.components.split_first()?;
        let mut value = self.entry(first)?;
        for component in rest {
            value = value.child(component)?;
        }
        Some(value)
    }

    /// Get a mutable value by dotted key.
    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut Value> {
        let key = key.into();
        let (first, rest) = key.components.split_first()?;
        let mut value = self.entry_mut(first)?;
        for component in rest {
            value = value.child_mut(component)?;
        }
        Some(value)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.get(key).is_some()
    }

    /// Get a subtree by dotted key. The empty key returns `self`.
    pub fn node(&self, key: impl Into<Key>) -> Option<&Tree> {
        let key = key.into();
        if key.is_empty() {
            return Some(self);
        }
        self.get(key)?.as_tree()
    }

    /// Get a value rendered as text; missing keys render as the empty string.
    pub fn text(&self, key: impl Into<Key>) -> String {
        self.get(key).map(Value::to_text).unwrap_or_default()
    }

    /// Navigate to the tree holding the last component of `key`, creating
    /// intermediate subtrees as needed. Null entries on the way are replaced
    /// with empty subtrees; any other scalar is an error.
    fn parent_mut(&mut self, key: &Key) -> Result<(&mut Tree, String), TreeError> {
        let (parents, last) = key.split_last().ok_or(TreeError::EmptyKey)?;

        let mut current = self;
        for component in parents {
            let i = match current.position(component) {
                Some(i) => i,
                None => {
                    current
                        .entries
                        .push((component.clone(), Value::Tree(Tree::new())));
                    current.entries.len() - 1
                }
            };
            let slot = &mut current.entries[i].1;
            if slot.is_null() {
                *slot = Value::Tree(Tree::new());
            }
            current = match slot {
                Value::Tree(t) => t,
                _ => {
                    return Err(TreeError::NotATree {
                        key: key.to_string(),
                        component: component.clone(),
                    })
                }
            };
        }

        Ok((current, last.clone()))
    }

    /// Set a value at a dotted key, creating intermediate subtrees.
    ///
    /// Returns the replaced value, if any.
    ///
    /// # Errors
    ///
    /// Fails when the key is empty or descends through a scalar
    /// (e.g. setting `user.name` when `user` is a string).
    pub fn set(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, TreeError> {
        let key = key.into();
        let (parent, last) = self.parent_mut(&key)?;
        Ok(parent.insert(last, value))
    }

    /// Add a value under a key without overwriting.
    ///
    /// The first value is stored as is. Each further value turns the entry into
    /// a [`Value::List`] of siblings, in arrival order.
    pub fn append(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), TreeError> {
        let key = key.into();
        let value = value.into();
        let (parent, last) = self.parent_mut(&key)?;
        match parent.entry_mut(&last) {
            None => {
                parent.insert(last, value);
            }
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::List(vec![first, value]);
            }
        }
        Ok(())
    }

    /// Replace whatever is at `key` with a fresh empty subtree and return it.
    pub fn create(&mut self, key: impl Into<Key>) -> Result<&mut Tree, TreeError> {
        let key = key.into();
        let (parent, last) = self.parent_mut(&key)?;
        parent.insert(last.clone(), Tree::new());
        parent
            .entry_mut(&last)
            .and_then(Value::as_tree_mut)
            .ok_or(TreeError::EmptyKey)
    }

    /// Remove the value at a dotted key, returning it if it existed.
    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        let (parents, last) = key.split_last()?;
        let parent = if parents.is_empty() {
            self
        } else {
            let parent_key = Key {
                components: parents.to_vec(),
            };
            self.get_mut(parent_key)?.as_tree_mut()?
        };
        let i = parent.position(last)?;
        Some(parent.entries.remove(i).1)
    }

    /// Merge `other` into this tree.
    ///
    /// Subtrees present on both sides are merged recursively; for any other
    /// conflict the value from `other` wins. New keys are appended in `other`'s
    /// order.
    pub fn merge(&mut self, other: &Tree) {
        for (name, value) in &other.entries {
            if let (Some(i), Value::Tree(theirs)) = (self.position(name), value) {
                if let Value::Tree(mine) = &mut self.entries[i].1 {
                    mine.merge(theirs);
                    continue;
                }
            }
            self.insert(name.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, Value)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut tree = Tree::new();
        for (k, v) in iter {
            tree.insert(k, v);
        }
        tree
    }
}
