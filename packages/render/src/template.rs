//! The template engine seam.

use std::fmt;
use std::sync::Arc;

use docserve_tree::Tree;

use crate::RenderError;

/// A parsed template, ready to run against a context tree.
///
/// Processing may write into the context. The dispatcher relies on this for
/// the `mime` override: a template sets `mime` (and optionally `content`) and
/// the response picks them up afterwards.
pub trait CompiledTemplate: Send + Sync {
    fn process(&self, context: &mut Tree) -> Result<Vec<u8>, RenderError>;
}

/// A cheap-to-clone handle to a [`CompiledTemplate`].
#[derive(Clone)]
pub struct Template {
    inner: Arc<dyn CompiledTemplate>,
}

impl Template {
    pub fn new(compiled: impl CompiledTemplate + 'static) -> Self {
        Self {
            inner: Arc::new(compiled),
        }
    }

    /// Run the template against `context`.
    pub fn process(&self, context: &mut Tree) -> Result<Vec<u8>, RenderError> {
        self.inner.process(context)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template").finish_non_exhaustive()
    }
}

/// Parses template sources into [`Template`] handles.
///
/// # Object Safety
///
/// This trait is object-safe: the server holds an `Arc<dyn TemplateEngine>`.
pub trait TemplateEngine: Send + Sync {
    fn parse(&self, source: &str) -> Result<Template, RenderError>;
}

impl<T: TemplateEngine + ?Sized> TemplateEngine for Arc<T> {
    fn parse(&self, source: &str) -> Result<Template, RenderError> {
        self.as_ref().parse(source)
    }
}

impl<T: TemplateEngine + ?Sized> TemplateEngine for Box<T> {
    fn parse(&self, source: &str) -> Result<Template, RenderError> {
        self.as_ref().parse(source)
    }
}
