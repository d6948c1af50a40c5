//! Server configuration.
//!
//! Loaded from `.conf/config.json` below the document root. Every field has a
//! default, and command line flags override what the file says.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use docserve_resolver::{ResolverOptions, StaticListTable};
use serde::Deserialize;

use crate::ServerError;

/// Directory below the root holding configuration. Hidden, so never served.
pub const CONF_DIR: &str = ".conf";

/// Where a named template comes from.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TemplateSource {
    /// A file, relative to the document root.
    Path(String),
    /// Template source given in place.
    Inline { inline: String },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Serve one document tree per host, below `<root>/<host>/`.
    pub multi_host: bool,
    pub max_sessions: usize,
    pub session_timeout_minutes: u64,
    /// Idle timeout of sessions that logged in with `remember`.
    pub remember_timeout_minutes: u64,
    pub session_cookie: String,
    pub identity_cookie: String,
    /// HMAC key for the identity cookie. Generated at startup when empty.
    pub identity_key: String,
    pub cookie_max_age_days: u64,
    /// Identity used when a session has none.
    pub default_user: Option<String>,
    pub home: String,
    pub login_path: String,
    /// URL prefixes served as raw files, without sessions or templates.
    pub static_prefixes: Vec<String>,
    /// Parameter key suffix marking a structured (tree notation) value.
    pub structured_suffix: String,
    /// Plain file extensions rendered as inline templates.
    pub inline_template_extensions: Vec<String>,
    /// Largest request body read before answering 413.
    pub max_body_bytes: usize,
    pub templates: HashMap<String, TemplateSource>,
    /// User name to hex SHA-256 of the password.
    pub users: HashMap<String, String>,
    pub static_lists: StaticListTable,
    /// Per-host static lists; a host without an entry uses `static_lists`.
    pub host_static_lists: HashMap<String, StaticListTable>,
    pub resolver: ResolverOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            multi_host: false,
            max_sessions: 10_000,
            session_timeout_minutes: 30,
            remember_timeout_minutes: 90 * 24 * 60,
            session_cookie: "session".to_string(),
            identity_cookie: "userid".to_string(),
            identity_key: String::new(),
            cookie_max_age_days: 90,
            default_user: None,
            home: "/".to_string(),
            login_path: "/login".to_string(),
            static_prefixes: Vec::new(),
            structured_suffix: "._json".to_string(),
            inline_template_extensions: vec!["csv".into(), "xml".into(), "svg".into()],
            max_body_bytes: 10 << 20,
            templates: HashMap::new(),
            users: HashMap::new(),
            static_lists: StaticListTable::default(),
            host_static_lists: HashMap::new(),
            resolver: ResolverOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Default location of the configuration file for a document root.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONF_DIR).join("config.json")
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&text).map_err(|message| ServerError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }
}
