use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use docserve_render::Template;
use docserve_tree::Tree;

/// Parameters captured from variable path segments, by variable name.
pub type Params = BTreeMap<String, String>;

/// The type of a resolved node, without its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
    Data,
    Document,
    Template,
    Markdown,
    RevisionList,
    Log,
}

impl NodeKind {
    /// Lowercase name, used as the default template name for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Directory => "dir",
            NodeKind::Data => "data",
            NodeKind::Document => "document",
            NodeKind::Template => "template",
            NodeKind::Markdown => "markdown",
            NodeKind::RevisionList => "revisions",
            NodeKind::Log => "log",
        }
    }
}

/// Classified content of a resolved node.
#[derive(Clone, Debug)]
pub enum NodeContent {
    /// Plain file, served as is.
    File,
    /// Directory listing: `entries` is a list of `{name, dir}` trees.
    Directory { listing: Tree },
    /// Structured data parsed from the file.
    Data(Tree),
    /// A document rendered to intermediate HTML.
    Document { html: String },
    /// A parsed template, processed against the request context.
    Template(Template),
    /// Markdown rendered to intermediate HTML.
    Markdown { html: String },
    /// A revision directory. `name` keeps its trailing revision marker.
    RevisionList { name: String, revisions: Vec<String> },
    /// A log file, shown through a template.
    Log,
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::File => NodeKind::File,
            NodeContent::Directory { .. } => NodeKind::Directory,
            NodeContent::Data(_) => NodeKind::Data,
            NodeContent::Document { .. } => NodeKind::Document,
            NodeContent::Template(_) => NodeKind::Template,
            NodeContent::Markdown { .. } => NodeKind::Markdown,
            NodeContent::RevisionList { .. } => NodeKind::RevisionList,
            NodeContent::Log => NodeKind::Log,
        }
    }
}

/// The result of resolving a URL path.
#[derive(Clone, Debug)]
pub struct ResolvedNode {
    /// Path of the entry relative to the store root.
    pub path: PathBuf,
    pub content: NodeContent,
    /// Raw bytes of the entry. Empty for directories and revision lists.
    pub source: Bytes,
    /// MIME type inferred from the entry name; `None` for directories.
    pub mime: Option<String>,
    /// Values captured from variable segments, plus the static-list sink.
    pub params: Params,
    /// Number of URL components consumed as directories before the entry.
    pub dir_depth: usize,
    /// Template named by the entry itself (a `.template` file for
    /// directories, a top-level `template` key for data).
    pub template_override: Option<String>,
}

impl ResolvedNode {
    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    /// File name of the entry, or the empty string for the root.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
