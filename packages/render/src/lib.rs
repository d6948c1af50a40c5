//! Rendering collaborators.
//!
//! The document server never interprets template expressions or markdown on
//! its own. It talks to two narrow interfaces:
//!
//! - [`TemplateEngine`]: `parse(source) -> Template`, then
//!   `Template::process(&mut Tree) -> bytes`.
//! - [`MarkdownRenderer`]: `render(source) -> html`.
//!
//! [`BraceEngine`] and [`BasicMarkdown`] are small default implementations so a
//! server works out of the box; richer engines plug in through the traits.

mod brace;
mod error;
mod markdown;
mod template;

pub use brace::BraceEngine;
pub use error::RenderError;
pub use markdown::{escape_html, BasicMarkdown, MarkdownRenderer};
pub use template::{CompiledTemplate, Template, TemplateEngine};
