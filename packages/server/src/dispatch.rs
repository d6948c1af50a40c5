//! Turns a resolved node plus its context into response bytes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use docserve_render::{Template, TemplateEngine};
use docserve_resolver::{NodeContent, ResolvedNode};
use docserve_tree::{notation, Tree, Value};
use tracing::debug;

use crate::config::TemplateSource;
use crate::{DocRequest, ServerError};

pub const DEFAULT_MIME: &str = "application/octet-stream";
const HTML_MIME: &str = "text/html";
const JSON_MIME: &str = "application/json";

/// Per-request rendering switches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    /// Bypass templating and return the entry as stored (`m=raw`).
    pub raw: bool,
    /// Template to use instead of the default for the node (`t=<name>`).
    pub template: Option<String>,
}

impl RenderOptions {
    pub fn from_request(req: &DocRequest) -> Self {
        Self {
            raw: req.param("m") == Some("raw"),
            template: req
                .param("t")
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }
}

/// Rendered output and its MIME type.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub mime: String,
}

/// Renders nodes through named templates.
///
/// | node                          | rendering                                   |
/// |-------------------------------|---------------------------------------------|
/// | template                      | processed in place                          |
/// | markdown                      | wrapped in `readme` or `markdown`           |
/// | directory, data, document, log| `t`, then node override, then type template |
/// | revision list                 | same, default `revisions`                   |
/// | file                          | inline template by extension, else as is    |
pub struct Dispatcher {
    engine: Arc<dyn TemplateEngine>,
    templates: HashMap<String, Template>,
    inline_extensions: Vec<String>,
    revision_marker: char,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            engine,
            templates: HashMap::new(),
            inline_extensions: vec!["csv".into(), "xml".into(), "svg".into()],
            revision_marker: '@',
        }
    }

    /// Create a dispatcher and parse every configured template. Template
    /// paths are relative to `root`.
    pub fn load(
        engine: Arc<dyn TemplateEngine>,
        root: &Path,
        sources: &HashMap<String, TemplateSource>,
    ) -> Result<Self, ServerError> {
        let mut dispatcher = Self::new(engine);
        for (name, source) in sources {
            let text = match source {
                TemplateSource::Inline { inline } => inline.clone(),
                TemplateSource::Path(rel) => {
                    let path = root.join(rel);
                    fs::read_to_string(&path).map_err(|e| ServerError::Config {
                        path,
                        message: format!("template '{name}': {e}"),
                    })?
                }
            };
            dispatcher.add_template(name.clone(), &text)?;
        }
        debug!(count = dispatcher.templates.len(), "templates loaded");
        Ok(dispatcher)
    }

    /// Parse and register a named template.
    pub fn add_template(&mut self, name: impl Into<String>, source: &str) -> Result<(), ServerError> {
        let template = self.engine.parse(source)?;
        self.templates.insert(name.into(), template);
        Ok(())
    }

    pub fn with_inline_extensions(mut self, extensions: Vec<String>) -> Self {
        self.inline_extensions = extensions;
        self
    }

    pub fn with_revision_marker(mut self, marker: char) -> Self {
        self.revision_marker = marker;
        self
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn template(&self, name: &str) -> Result<&Template, ServerError> {
        self.templates
            .get(name)
            .ok_or_else(|| ServerError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Render `node` against `context`.
    ///
    /// # Errors
    ///
    /// [`ServerError::TemplateNotFound`] when the selected template is not
    /// registered, [`ServerError::EmptyContent`] when rendering produced no
    /// bytes, and any template processing error.
    pub fn render(
        &self,
        node: &ResolvedNode,
        context: &mut Tree,
        options: &RenderOptions,
    ) -> Result<Rendered, ServerError> {
        let rendered = if options.raw {
            self.render_raw(node, context, options)?
        } else {
            self.render_node(node, context, options)?
        };

        if rendered.body.is_empty() {
            return Err(ServerError::EmptyContent);
        }
        Ok(rendered)
    }

    fn render_raw(
        &self,
        node: &ResolvedNode,
        context: &mut Tree,
        options: &RenderOptions,
    ) -> Result<Rendered, ServerError> {
        if let Some(name) = &options.template {
            self.inject(node, context)?;
            return self.process_named(name, context);
        }

        match &node.content {
            NodeContent::Directory { listing } => Ok(Rendered {
                body: notation::to_string(listing).into_bytes(),
                mime: JSON_MIME.to_string(),
            }),
            NodeContent::RevisionList { .. } => Ok(Rendered {
                body: notation::to_string(&self.revision_data(node)).into_bytes(),
                mime: JSON_MIME.to_string(),
            }),
            _ => Ok(Rendered {
                body: node.source.to_vec(),
                mime: node_mime(node),
            }),
        }
    }

    fn render_node(
        &self,
        node: &ResolvedNode,
        context: &mut Tree,
        options: &RenderOptions,
    ) -> Result<Rendered, ServerError> {
        match &node.content {
            NodeContent::Template(template) => {
                let mime = node.mime.as_deref().unwrap_or(HTML_MIME);
                self.process(template, context, mime)
            }
            NodeContent::Markdown { .. } => {
                self.inject(node, context)?;
                let default = if is_readme(node) { "readme" } else { "markdown" };
                self.process_named(select(options, node, default), context)
            }
            NodeContent::Directory { .. }
            | NodeContent::Data(_)
            | NodeContent::Document { .. }
            | NodeContent::Log
            | NodeContent::RevisionList { .. } => {
                self.inject(node, context)?;
                let default = node.kind().as_str();
                self.process_named(select(options, node, default), context)
            }
            NodeContent::File => {
                let inline = Path::new(&node.name())
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| {
                        self.inline_extensions
                            .iter()
                            .any(|x| x.eq_ignore_ascii_case(ext))
                    });
                if inline {
                    let template = self.engine.parse(&String::from_utf8_lossy(&node.source))?;
                    self.process(&template, context, &node_mime(node))
                } else {
                    Ok(Rendered {
                        body: node.source.to_vec(),
                        mime: node_mime(node),
                    })
                }
            }
        }
    }

    /// Put the node's content where templates find it: `path.content` for
    /// text, `path.data` for structured data.
    fn inject(&self, node: &ResolvedNode, context: &mut Tree) -> Result<(), ServerError> {
        match &node.content {
            NodeContent::Markdown { html } | NodeContent::Document { html } => {
                context.set("path.content", html.as_str())?;
            }
            NodeContent::Data(tree) => {
                context.set("path.data", tree.clone())?;
                context.set("path.content", text(node))?;
            }
            NodeContent::Directory { listing } => {
                context.set("path.data", listing.clone())?;
            }
            NodeContent::RevisionList { .. } => {
                context.set("path.data", self.revision_data(node))?;
            }
            NodeContent::Log | NodeContent::File | NodeContent::Template(_) => {
                context.set("path.content", text(node))?;
            }
        }
        context.set("path.name", node.name())?;
        context.set("path.type", node.kind().as_str())?;
        Ok(())
    }

    fn revision_data(&self, node: &ResolvedNode) -> Tree {
        let mut data = Tree::new();
        if let NodeContent::RevisionList { name, revisions } = &node.content {
            let display = name.strip_suffix(self.revision_marker).unwrap_or(name);
            data.insert("name", display);
            data.insert(
                "revisions",
                Value::List(revisions.iter().map(Value::from).collect()),
            );
        }
        data
    }

    fn process_named(&self, name: &str, context: &mut Tree) -> Result<Rendered, ServerError> {
        debug!(template = name, "rendering");
        let template = self.template(name)?;
        self.process(template, context, HTML_MIME)
    }

    /// Process a template. A template may set `mime` to change the response
    /// type; it may then also set `content` to replace the output.
    fn process(
        &self,
        template: &Template,
        context: &mut Tree,
        default_mime: &str,
    ) -> Result<Rendered, ServerError> {
        context.remove("mime");
        let mut body = template.process(context)?;

        let mut mime = default_mime.to_string();
        if let Some(set) = context.get("mime").map(Value::to_text) {
            if !set.is_empty() {
                mime = set;
                if let Some(content) = context.get("content") {
                    body = content.to_bytes();
                }
            }
        }
        Ok(Rendered { body, mime })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.templates.keys().collect();
        names.sort();
        f.debug_struct("Dispatcher")
            .field("templates", &names)
            .field("inline_extensions", &self.inline_extensions)
            .finish_non_exhaustive()
    }
}

fn select<'a>(options: &'a RenderOptions, node: &'a ResolvedNode, default: &'a str) -> &'a str {
    options
        .template
        .as_deref()
        .or(node.template_override.as_deref())
        .unwrap_or(default)
}

fn is_readme(node: &ResolvedNode) -> bool {
    Path::new(&node.name())
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.eq_ignore_ascii_case("readme"))
}

fn node_mime(node: &ResolvedNode) -> String {
    node.mime.clone().unwrap_or_else(|| DEFAULT_MIME.to_string())
}

fn text(node: &ResolvedNode) -> String {
    String::from_utf8_lossy(&node.source).into_owned()
}
