//! A minimal substitution engine.
//!
//! Syntax:
//!
//! - `{{ a.b }}` prints the context value at `a.b` (empty when missing).
//! - `{{ key = value }}` stores `value` at `key` and prints nothing. Quotes
//!   around `value` are stripped. This is how templates set `mime`.
//! - `{{{{` prints a literal `{{`.

use docserve_tree::{Key, Tree};

use crate::{CompiledTemplate, RenderError, Template, TemplateEngine};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const ESCAPED_OPEN: &str = "{{{{";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Lookup(Key),
    Assign(Key, String),
}

#[derive(Debug)]
struct BraceTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate for BraceTemplate {
    fn process(&self, context: &mut Tree) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.extend_from_slice(text.as_bytes()),
                Segment::Lookup(key) => {
                    if let Some(value) = context.get(key.clone()) {
                        out.extend_from_slice(&value.to_bytes());
                    }
                }
                Segment::Assign(key, value) => {
                    context.set(key.clone(), value.as_str())?;
                }
            }
        }
        Ok(out)
    }
}

/// The default [`TemplateEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BraceEngine;

impl BraceEngine {
    pub fn new() -> Self {
        Self
    }

    fn compile(source: &str) -> Result<Vec<Segment>, RenderError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            literal.push_str(&rest[..start]);

            if rest[start..].starts_with(ESCAPED_OPEN) {
                literal.push_str(OPEN);
                let consumed = start + ESCAPED_OPEN.len();
                rest = &rest[consumed..];
                offset += consumed;
                continue;
            }

            let body_start = start + OPEN.len();
            let end = rest[body_start..]
                .find(CLOSE)
                .ok_or_else(|| RenderError::Parse {
                    offset: offset + start,
                    message: "unclosed '{{'".to_string(),
                })?;
            let expr = rest[body_start..body_start + end].trim();

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Self::expression(expr, offset + start)?);

            let consumed = body_start + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn expression(expr: &str, offset: usize) -> Result<Segment, RenderError> {
        let (key, assigned) = match expr.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (expr, None),
        };

        let key = Key::parse(key);
        if key.is_empty() {
            return Err(RenderError::Parse {
                offset,
                message: format!("empty key in '{{{{{}}}}}'", expr),
            });
        }

        Ok(match assigned {
            Some(value) => {
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Segment::Assign(key, value.to_string())
            }
            None => Segment::Lookup(key),
        })
    }
}

impl TemplateEngine for BraceEngine {
    fn parse(&self, source: &str) -> Result<Template, RenderError> {
        Ok(Template::new(BraceTemplate {
            segments: Self::compile(source)?,
        }))
    }
}
