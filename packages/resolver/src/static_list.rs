use std::collections::HashMap;

use serde::Deserialize;

/// Decides whether the rest of a path, below a variable segment, should be
/// collapsed into a single parameter instead of resolved level by level.
pub trait StaticLists: Send + Sync {
    /// `variable` is the variable name (without its marker), `value` the URL
    /// component it captured, `rest` the remaining components joined by `/`.
    fn contains(&self, variable: &str, value: &str, rest: &str) -> bool;
}

/// No static lists: every path resolves level by level.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStaticLists;

impl StaticLists for NoStaticLists {
    fn contains(&self, _variable: &str, _value: &str, _rest: &str) -> bool {
        false
    }
}

/// Static lists from configuration.
///
/// Keys are either a variable name (`"user"`) or a variable bound to one
/// value (`"user=alice"`); the bound form is checked first. Each list holds
/// paths; an entry ending in `/` matches everything below it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticListTable {
    lists: HashMap<String, Vec<String>>,
}

impl StaticListTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.lists.entry(key.into()).or_default().push(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    fn list_matches(list: &[String], rest: &str) -> bool {
        list.iter().any(|entry| {
            let entry = entry.trim_start_matches('/');
            match entry.strip_suffix('/') {
                Some(prefix) => rest == prefix || rest.starts_with(entry),
                None => rest == entry,
            }
        })
    }
}

impl StaticLists for StaticListTable {
    fn contains(&self, variable: &str, value: &str, rest: &str) -> bool {
        if let Some(list) = self.lists.get(&format!("{variable}={value}")) {
            return Self::list_matches(list, rest);
        }
        self.lists
            .get(variable)
            .is_some_and(|list| Self::list_matches(list, rest))
    }
}
