use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use docserve_render::{MarkdownRenderer, TemplateEngine};
use docserve_tree::{Tree, Value};
use tracing::{debug, trace};

use crate::cache::{DirCache, DirEntry};
use crate::classify::extension;
use crate::{clean, NodeContent, Params, ResolveError, ResolvedNode, ResolverOptions, StaticLists};

/// Resolves URL paths against a directory tree.
///
/// A `Resolver` is shared by all request handlers. The only mutable state is
/// the directory listing cache, which is safe for concurrent use.
pub struct Resolver {
    pub(crate) root: PathBuf,
    pub(crate) options: ResolverOptions,
    pub(crate) cache: DirCache,
    pub(crate) engine: Arc<dyn TemplateEngine>,
    pub(crate) markdown: Arc<dyn MarkdownRenderer>,
}

impl Resolver {
    /// Create a resolver mounted at `root`.
    ///
    /// # Errors
    ///
    /// Fails if `root` does not exist or is not a directory.
    pub fn new(
        root: impl AsRef<Path>,
        options: ResolverOptions,
        engine: Arc<dyn TemplateEngine>,
        markdown: Arc<dyn MarkdownRenderer>,
    ) -> Result<Self, ResolveError> {
        let path = root.as_ref();
        let root = path
            .canonicalize()
            .map_err(|source| ResolveError::RootInvalid {
                path: path.to_path_buf(),
                source,
            })?;
        if !root.is_dir() {
            return Err(ResolveError::RootInvalid {
                path: root,
                source: io::Error::other("not a directory"),
            });
        }

        let cache = DirCache::new(options.cache_listings);
        Ok(Self {
            root,
            options,
            cache,
            engine,
            markdown,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Drop cached directory listings, e.g. after the store changed on disk.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Resolve a URL path to a node.
    ///
    /// Components are matched level by level. When a component matches no
    /// entry, the fallbacks are tried in order: an optional extension, a
    /// revision-qualified name, and finally a variable entry of the current
    /// directory. `lists` decides whether the rest of the path below a
    /// variable entry collapses into the static sink parameter.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidPath`] for hidden (or filtered variable) components
    /// - [`ResolveError::NotFound`] when a component matches nothing
    /// - [`ResolveError::Io`], [`ResolveError::Template`], [`ResolveError::Data`]
    ///   when the matched entry cannot be read or decoded
    pub fn resolve(
        &self,
        url_path: &str,
        lists: &dyn StaticLists,
    ) -> Result<ResolvedNode, ResolveError> {
        let mut pending: VecDeque<String> = clean::components(url_path).into();
        for component in &pending {
            self.validate(component)?;
        }

        let mut rel = PathBuf::new();
        let mut params = Params::new();
        let mut depth = 0;

        while let Some(component) = pending.pop_front() {
            let candidate = rel.join(&component);
            match self.stat(&candidate)? {
                Some(true) => {
                    rel = candidate;
                    depth += 1;
                }
                Some(false) => {
                    trace!(url = url_path, path = %candidate.display(), "resolved file");
                    return self.load_file(candidate, params, depth);
                }
                None => {
                    let listing = self.list(&rel)?;

                    if let Some(name) = self.with_extension(&listing, &component) {
                        pending.push_front(name);
                        continue;
                    }

                    if let Some((base, revision)) = self.split_revision(&listing, &component) {
                        pending.push_front(revision);
                        pending.push_front(base);
                        continue;
                    }

                    let Some((entry, variable)) = self.variable_entry(&listing, &component) else {
                        debug!(url = url_path, component = %component, "no match");
                        return Err(ResolveError::NotFound {
                            path: clean::clean(url_path),
                        });
                    };

                    let rest = pending.iter().map(String::as_str).collect::<Vec<_>>().join("/");
                    if !rest.is_empty() && lists.contains(&variable, &component, &rest) {
                        debug!(variable = %variable, value = %component, rest = %rest, "static list match");
                        let sink = self.options.static_sink.clone();
                        params.insert(sink.clone(), rest);
                        pending.clear();
                        pending.push_back(sink);
                    }
                    params.insert(variable, component);

                    // the variable entry is taken as is, never matched again
                    let candidate = rel.join(&entry);
                    match self.stat(&candidate)? {
                        Some(true) => {
                            rel = candidate;
                            depth += 1;
                        }
                        Some(false) => {
                            trace!(url = url_path, path = %candidate.display(), "resolved variable file");
                            return self.load_file(candidate, params, depth);
                        }
                        None => {
                            debug!(url = url_path, entry = %entry, "variable entry unreadable");
                            return Err(ResolveError::NotFound {
                                path: clean::clean(url_path),
                            });
                        }
                    }
                }
            }
        }

        self.load_directory(rel, params, depth)
    }

    fn validate(&self, component: &str) -> Result<(), ResolveError> {
        if component.starts_with(self.options.hidden_marker) {
            return Err(ResolveError::InvalidPath {
                component: component.to_string(),
                reason: "hidden entries are not served".to_string(),
            });
        }
        if self.options.filter_variable_paths && component.starts_with(self.options.variable_marker)
        {
            return Err(ResolveError::InvalidPath {
                component: component.to_string(),
                reason: "variable entries are not addressable".to_string(),
            });
        }
        Ok(())
    }

    fn is_hidden(&self, name: &str) -> bool {
        name.starts_with(self.options.hidden_marker)
    }

    /// `Some(is_dir)` if `rel` exists below the root.
    fn stat(&self, rel: &Path) -> Result<Option<bool>, ResolveError> {
        let path = self.root.join(rel);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.is_dir())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResolveError::Io { path, source }),
        }
    }

    fn list(&self, rel: &Path) -> Result<Arc<[DirEntry]>, ResolveError> {
        let path = self.root.join(rel);
        self.cache
            .list(&path)
            .map_err(|source| ResolveError::Io { path, source })
    }

    /// `component` plus the first optional extension naming a file.
    fn with_extension(&self, listing: &[DirEntry], component: &str) -> Option<String> {
        self.options.optional_extensions.iter().find_map(|ext| {
            let name = format!("{component}.{ext}");
            listing
                .iter()
                .any(|e| !e.is_dir && e.name == name)
                .then_some(name)
        })
    }

    /// Split `name@rev` into the revision directory `name@` and `rev`, if
    /// that directory exists.
    fn split_revision(&self, listing: &[DirEntry], component: &str) -> Option<(String, String)> {
        let marker = self.options.revision_marker;
        let at = component.rfind(marker)?;
        let split = at + marker.len_utf8();
        let (base, revision) = component.split_at(split);
        if at == 0 || revision.is_empty() {
            return None;
        }
        listing
            .iter()
            .any(|e| e.is_dir && e.name == base)
            .then(|| (base.to_string(), revision.to_string()))
    }

    /// The first variable entry of a listing and its variable name.
    fn variable_entry(&self, listing: &[DirEntry], component: &str) -> Option<(String, String)> {
        let marker = self.options.variable_marker;
        listing.iter().find_map(|e| {
            // never rewrite a component into itself
            if e.name == component {
                return None;
            }
            let name = e.name.strip_prefix(marker)?;
            let variable = if e.is_dir {
                name
            } else {
                match extension(name) {
                    Some(ext) if self.options.optional_extensions.iter().any(|x| x == ext) => {
                        &name[..name.len() - ext.len() - 1]
                    }
                    _ => name,
                }
            };
            (!variable.is_empty()).then(|| (e.name.clone(), variable.to_string()))
        })
    }

    fn load_file(
        &self,
        rel: PathBuf,
        params: Params,
        depth: usize,
    ) -> Result<ResolvedNode, ResolveError> {
        let path = self.root.join(&rel);
        let source = Bytes::from(fs::read(&path).map_err(|source| ResolveError::Io { path, source })?);

        let type_name = self.type_name(&rel);
        let (content, template_override) = self.classify(&rel, &type_name, &source)?;
        let mime = mime_guess::from_path(&type_name)
            .first_raw()
            .map(str::to_string);

        debug!(path = %rel.display(), kind = content.kind().as_str(), "loaded");
        Ok(ResolvedNode {
            path: rel,
            content,
            source,
            mime,
            params,
            dir_depth: depth,
            template_override,
        })
    }

    /// The name that decides a file's type: its own name, or for a file in a
    /// revision directory, the directory name without the marker.
    fn type_name(&self, rel: &Path) -> String {
        let marker = self.options.revision_marker;
        let parent = rel
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(marker))
            .filter(|n| !n.is_empty());
        match parent {
            Some(base) => base.to_string(),
            None => rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn load_directory(
        &self,
        rel: PathBuf,
        params: Params,
        depth: usize,
    ) -> Result<ResolvedNode, ResolveError> {
        let listing = self.list(&rel)?;
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.len() > 1 && name.ends_with(self.options.revision_marker) {
            let revisions = listing
                .iter()
                .filter(|e| !e.is_dir && !self.is_hidden(&e.name))
                .map(|e| e.name.clone())
                .collect();
            debug!(path = %rel.display(), "revision list");
            let content = NodeContent::RevisionList { name, revisions };
            return Ok(directory_node(rel, content, params, depth, None));
        }

        for index in &self.options.index_names {
            if listing.iter().any(|e| !e.is_dir && e.name == *index) {
                return self.load_file(rel.join(index), params, depth);
            }
        }

        let entries = listing
            .iter()
            .filter(|e| !self.is_hidden(&e.name))
            .map(|e| {
                let mut t = Tree::new();
                t.insert("name", e.name.as_str());
                t.insert("dir", e.is_dir);
                Value::Tree(t)
            })
            .collect();
        let mut tree = Tree::new();
        tree.insert("name", name);
        tree.insert("entries", Value::List(entries));

        let template_override = self.directory_template(&rel);
        debug!(path = %rel.display(), "directory listing");
        let content = NodeContent::Directory { listing: tree };
        Ok(directory_node(rel, content, params, depth, template_override))
    }

    fn directory_template(&self, rel: &Path) -> Option<String> {
        let path = self.root.join(rel).join(&self.options.template_marker_file);
        let text = fs::read_to_string(path).ok()?;
        let name = text.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

fn directory_node(
    rel: PathBuf,
    content: NodeContent,
    params: Params,
    depth: usize,
    template_override: Option<String>,
) -> ResolvedNode {
    ResolvedNode {
        path: rel,
        content,
        source: Bytes::new(),
        mime: None,
        params,
        dir_depth: depth,
        template_override,
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
