//! Path resolution for the document server.
//!
//! A [`Resolver`] maps a URL path onto a mounted directory tree and returns a
//! [`ResolvedNode`]: the concrete entry, its classified content, and any
//! parameters captured from variable path segments.
//!
//! Resolution features:
//! - trailing slash and index file fallback
//! - optional file extensions (`/about` finds `about.htm`)
//! - variable segments (`_user/` matches any component, captured as `user`)
//! - static lists that collapse the rest of a path into one `path` parameter
//! - revision-qualified entries (`notes.md@/3`, or `notes.md@3`)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docserve_render::{BasicMarkdown, BraceEngine};
//! use docserve_resolver::{NoStaticLists, Resolver, ResolverOptions};
//!
//! let resolver = Resolver::new(
//!     "site/",
//!     ResolverOptions::default(),
//!     Arc::new(BraceEngine),
//!     Arc::new(BasicMarkdown),
//! )
//! .unwrap();
//!
//! let node = resolver.resolve("/alice/notes", &NoStaticLists).unwrap();
//! println!("{} -> {:?}", node.path.display(), node.kind());
//! ```

mod cache;
pub mod clean;
mod classify;
mod error;
mod node;
mod options;
mod resolver;
mod static_list;

pub use cache::{DirCache, DirEntry};
pub use error::ResolveError;
pub use node::{NodeContent, NodeKind, Params, ResolvedNode};
pub use options::ResolverOptions;
pub use resolver::Resolver;
pub use static_list::{NoStaticLists, StaticListTable, StaticLists};
