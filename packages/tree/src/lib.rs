//! Context Tree: the attribute structure handed to document templates.
//!
//! A [`Tree`] is an ordered map of unique keys to [`Value`]s, where a value is
//! either a scalar or another tree. Keys are addressed with dotted paths such
//! as `R.urlbase` or `path.content`.
//!
//! Trees are plain owned data: `clone()` is a deep copy, so a tree derived from
//! a base tree can be mutated freely without touching the base.
//!
//! # Example
//!
//! ```rust
//! use docserve_tree::{Tree, Value};
//!
//! let mut base = Tree::new();
//! base.set("site.title", "Docs").unwrap();
//!
//! let mut session = base.clone();
//! session.set("user", "alice").unwrap();
//!
//! assert_eq!(session.text("site.title"), "Docs");
//! assert!(base.get("user").is_none());
//! ```

mod error;
mod key;
pub mod notation;
mod tree;
mod value;

pub use error::TreeError;
pub use key::Key;
pub use tree::Tree;
pub use value::Value;
