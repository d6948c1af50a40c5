use serde::Deserialize;

/// Resolver behavior. Every field has a default, so a configuration file only
/// needs to name what it changes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Components starting with this are never served.
    pub hidden_marker: char,
    /// A directory entry starting with this matches any component.
    pub variable_marker: char,
    /// Reject URL components that start with the variable marker.
    pub filter_variable_paths: bool,
    /// A directory whose name ends with this holds revisions of one document.
    pub revision_marker: char,
    /// Tried in order when a component matches nothing exactly.
    pub optional_extensions: Vec<String>,
    /// Tried in order when a path ends on a directory.
    pub index_names: Vec<String>,
    /// Parameter that receives the rest of a path collapsed by a static list.
    pub static_sink: String,
    /// File that names the template for a directory listing.
    pub template_marker_file: String,
    pub template_extensions: Vec<String>,
    pub markdown_extensions: Vec<String>,
    pub data_extensions: Vec<String>,
    pub document_extensions: Vec<String>,
    pub log_extensions: Vec<String>,
    /// Cache directory listings until invalidated.
    pub cache_listings: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            hidden_marker: '.',
            variable_marker: '_',
            filter_variable_paths: false,
            revision_marker: '@',
            optional_extensions: strings(&["htm", "md"]),
            index_names: strings(&["index.htm", "index.html", "readme.md"]),
            static_sink: "path".to_string(),
            template_marker_file: ".template".to_string(),
            template_extensions: strings(&["htm", "txt"]),
            markdown_extensions: strings(&["md"]),
            data_extensions: strings(&["json"]),
            document_extensions: strings(&["doc"]),
            log_extensions: strings(&["log"]),
            cache_listings: true,
        }
    }
}
