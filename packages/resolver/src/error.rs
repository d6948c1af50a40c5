use std::io;
use std::path::PathBuf;

use docserve_render::RenderError;
use docserve_tree::TreeError;

/// Errors from path resolution.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// A path component uses a reserved leading character.
    #[error("invalid path component '{component}': {reason}")]
    InvalidPath { component: String, reason: String },

    /// No entry matches the path at some level.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The store root is missing or not a directory.
    #[error("invalid store root {}: {source}", path.display())]
    RootInvalid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the underlying store failed.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A template entry could not be parsed.
    #[error("template error in {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    /// A data entry is not valid tree notation.
    #[error("malformed data in {}: {source}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
}

impl ResolveError {
    /// True for failures caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResolveError::InvalidPath { .. } | ResolveError::NotFound { .. }
        )
    }
}
