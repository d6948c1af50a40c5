//! The Value type - a scalar or a nested tree.

use crate::notation;
use crate::Tree;

/// A value stored in a [`Tree`].
///
/// Scalars cover what request parameters, configuration files and resolved
/// documents produce. `List` holds repeated values for one key (a form field
/// sent twice, for example); `Tree` holds a nested subtree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "key doesn't exist".
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Binary content, e.g. a document body that is not valid UTF-8.
    Bytes(Vec<u8>),
    /// Sibling values sharing one key, in arrival order.
    List(Vec<Value>),
    Tree(Tree),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a subtree.
    pub fn is_tree(&self) -> bool {
        matches!(self, Value::Tree(_))
    }

    /// Borrow the string if this value is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the subtree if this value is a `Tree`.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Value::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Mutably borrow the subtree if this value is a `Tree`.
    pub fn as_tree_mut(&mut self) -> Option<&mut Tree> {
        match self {
            Value::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Borrow the list items if this value is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Navigate one step down: a named entry of a tree, or an index of a list.
    pub fn child(&self, component: &str) -> Option<&Value> {
        match self {
            Value::Tree(t) => t.entry(component),
            Value::List(items) => items.get(component.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Mutable version of [`Value::child`].
    pub fn child_mut(&mut self, component: &str) -> Option<&mut Value> {
        match self {
            Value::Tree(t) => t.entry_mut(component),
            Value::List(items) => items.get_mut(component.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Render this value as text, the way templates print it.
    ///
    /// Lists print one item per line; subtrees print in tree notation.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Tree(t) => notation::to_string(t),
        }
    }

    /// Render this value as bytes. `Bytes` are returned verbatim.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(b) => b.clone(),
            other => other.to_text().into_bytes(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Tree> for Value {
    fn from(v: Tree) -> Self {
        Value::Tree(v)
    }
}
