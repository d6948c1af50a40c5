//! Tree notation: the serialized text form of a [`Tree`].
//!
//! Structured request parameters and on-disk data nodes are written in JSON.
//! Objects map to trees (key order preserved), arrays to [`Value::List`].

use crate::{Tree, TreeError, Value};

/// Key under which a non-object document is stored by [`parse`].
pub const SCALAR_KEY: &str = "_";

/// Parse tree notation text into a tree.
///
/// A top-level object becomes the tree itself. Any other top-level value is
/// wrapped in a one-entry tree under [`SCALAR_KEY`].
pub fn parse(text: &str) -> Result<Tree, TreeError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(match json_to_value(json) {
        Value::Tree(t) => t,
        other => {
            let mut t = Tree::new();
            t.insert(SCALAR_KEY, other);
            t
        }
    })
}

/// Parse tree notation from bytes.
pub fn parse_slice(bytes: &[u8]) -> Result<Tree, TreeError> {
    let json: serde_json::Value = serde_json::from_slice(bytes)?;
    Ok(match json_to_value(json) {
        Value::Tree(t) => t,
        other => {
            let mut t = Tree::new();
            t.insert(SCALAR_KEY, other);
            t
        }
    })
}

/// Serialize a tree to compact notation text.
pub fn to_string(tree: &Tree) -> String {
    to_json(tree).to_string()
}

/// Convert a tree to a `serde_json::Value` object.
pub fn to_json(tree: &Tree) -> serde_json::Value {
    serde_json::Value::Object(
        tree.iter()
            .map(|(k, v)| (k.to_string(), value_to_json(v)))
            .collect(),
    )
}

/// Convert a `serde_json::Value` to a tree value.
pub fn from_json(json: serde_json::Value) -> Value {
    json_to_value(json)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        // JSON has no bytes; documents are text in practice.
        Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Tree(t) => to_json(t),
    }
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Tree(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}
