//! Error types for tree navigation and notation parsing.

/// Errors raised while mutating or parsing a [`Tree`](crate::Tree).
#[derive(thiserror::Error, Debug)]
pub enum TreeError {
    /// A key tried to descend through a scalar value.
    #[error("cannot descend into '{component}' of key '{key}': not a tree")]
    NotATree { key: String, component: String },

    /// The key addressed the root where a named entry is required.
    #[error("empty key")]
    EmptyKey,

    /// Tree notation text could not be parsed.
    #[error("notation parse error: {0}")]
    Notation(#[from] serde_json::Error),
}
