use std::io;
use std::path::PathBuf;

use docserve_render::RenderError;
use docserve_resolver::ResolveError;
use docserve_tree::TreeError;
use http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("session capacity of {max} reached")]
    CapacityExceeded { max: usize },

    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Empty content")]
    EmptyContent,

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("context error: {0}")]
    Tree(#[from] TreeError),

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Resolve(ResolveError::InvalidPath { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Resolve(ResolveError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServerError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ServerError::CapacityExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
