use docserve_tree::TreeError;

/// Errors from template parsing and processing.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// The template source is malformed.
    #[error("template parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// The template tried an invalid context mutation.
    #[error("context error: {0}")]
    Context(#[from] TreeError),

    /// Engine-specific failure.
    #[error("{message}")]
    Other { message: String },
}
