//! Content classification of resolved files.

use std::path::Path;

use bytes::Bytes;
use docserve_tree::{notation, Value};

use crate::{NodeContent, ResolveError, Resolver};

/// Extension of a file name, without the dot.
pub(crate) fn extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

fn listed(list: &[String], ext: Option<&str>) -> bool {
    ext.is_some_and(|ext| list.iter().any(|l| l.eq_ignore_ascii_case(ext)))
}

impl Resolver {
    /// Classify a file by the extension of `type_name` and decode its
    /// content. Returns the content and any template named by the content.
    ///
    /// `type_name` is usually the file name. Inside a revision directory it
    /// is the directory name without the revision marker.
    pub(crate) fn classify(
        &self,
        rel: &Path,
        type_name: &str,
        source: &Bytes,
    ) -> Result<(NodeContent, Option<String>), ResolveError> {
        let ext = extension(type_name);
        let opts = &self.options;

        if listed(&opts.template_extensions, ext) {
            let text = String::from_utf8_lossy(source);
            let template = self
                .engine
                .parse(&text)
                .map_err(|source| ResolveError::Template {
                    path: rel.to_path_buf(),
                    source,
                })?;
            return Ok((NodeContent::Template(template), None));
        }

        if listed(&opts.markdown_extensions, ext) {
            let html = self.markdown.render(&String::from_utf8_lossy(source));
            return Ok((NodeContent::Markdown { html }, None));
        }

        if listed(&opts.data_extensions, ext) {
            let tree = notation::parse_slice(source).map_err(|source| ResolveError::Data {
                path: rel.to_path_buf(),
                source,
            })?;
            let template = tree
                .entry("template")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok((NodeContent::Data(tree), template));
        }

        if listed(&opts.document_extensions, ext) {
            let html = self.markdown.render(&String::from_utf8_lossy(source));
            return Ok((NodeContent::Document { html }, None));
        }

        if listed(&opts.log_extensions, ext) {
            return Ok((NodeContent::Log, None));
        }

        Ok((NodeContent::File, None))
    }
}
