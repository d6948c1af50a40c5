//! The document pipeline: session, context, resolution, rendering.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docserve_render::{BasicMarkdown, BraceEngine, MarkdownRenderer, TemplateEngine};
use docserve_resolver::{clean, NodeContent, ResolveError, Resolver, StaticLists};
use docserve_tree::{notation, Tree};
use http::header;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CONF_DIR;
use crate::dispatch::DEFAULT_MIME;
use crate::login::{login_flow, LoginOutcome};
use crate::{
    ContextAssembler, Dispatcher, DocRequest, DocResponse, IdentityCookie, IdentityProvider,
    PasswordTable, RenderOptions, ServerConfig, ServerError, Session, SessionRegistry,
};

/// Cache header for static prefixes.
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=36000";

const CONTEXT_FILE: &str = "context.json";

/// A document server for one root directory.
///
/// Everything a request needs is built once here and shared by reference:
/// configuration, base context trees, the resolver, session table and
/// templates. `handle` is safe to call from many threads at once.
pub struct DocServer {
    config: ServerConfig,
    resolver: Resolver,
    sessions: SessionRegistry,
    assembler: ContextAssembler,
    dispatcher: Dispatcher,
    identity: IdentityCookie,
    provider: Arc<dyn IdentityProvider>,
}

impl DocServer {
    /// Create a server with the bundled template engine and markdown renderer.
    pub fn new(root: impl AsRef<Path>, config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_renderers(root, config, Arc::new(BraceEngine), Arc::new(BasicMarkdown))
    }

    pub fn with_renderers(
        root: impl AsRef<Path>,
        config: ServerConfig,
        engine: Arc<dyn TemplateEngine>,
        markdown: Arc<dyn MarkdownRenderer>,
    ) -> Result<Self, ServerError> {
        let resolver = Resolver::new(root, config.resolver.clone(), Arc::clone(&engine), markdown)?;
        let root = resolver.root().to_path_buf();

        let key = if config.identity_key.is_empty() {
            warn!("no identity_key configured, identity cookies will not survive a restart");
            [Uuid::new_v4().into_bytes(), Uuid::new_v4().into_bytes()].concat()
        } else {
            config.identity_key.as_bytes().to_vec()
        };
        let identity = IdentityCookie::new(
            config.identity_cookie.as_str(),
            key,
            Duration::from_secs(config.cookie_max_age_days.saturating_mul(24 * 60 * 60)),
        );

        let base = load_context(&root.join(CONF_DIR).join(CONTEXT_FILE))?;
        let mut assembler = ContextAssembler::new(base.clone(), identity.clone())
            .with_home(config.home.as_str())
            .with_structured_suffix(config.structured_suffix.as_str())
            .with_default_user(config.default_user.clone());
        if config.multi_host {
            assembler = assembler.with_hosts(load_host_contexts(&root, &base)?);
        }

        let dispatcher = Dispatcher::load(engine, &root, &config.templates)?
            .with_inline_extensions(config.inline_template_extensions.clone())
            .with_revision_marker(config.resolver.revision_marker);

        let sessions = SessionRegistry::new(
            config.max_sessions,
            Duration::from_secs(config.session_timeout_minutes.saturating_mul(60)),
        );
        let provider = Arc::new(PasswordTable::new(config.users.clone()));

        info!(root = %root.display(), multi_host = config.multi_host, "document server ready");
        Ok(Self {
            config,
            resolver,
            sessions,
            assembler,
            dispatcher,
            identity,
            provider,
        })
    }

    /// Replace the password table with another identity provider.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    pub fn identity(&self) -> &IdentityCookie {
        &self.identity
    }

    pub fn identity_provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Handle one request. Errors become plain text responses with the
    /// matching status; nothing is written before the outcome is known.
    pub fn handle(&self, req: &DocRequest) -> DocResponse {
        match self.try_handle(req) {
            Ok(response) => {
                debug!(path = %req.path, status = %response.status, "handled");
                response
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    error!(path = %req.path, error = %e, "request failed");
                } else {
                    debug!(path = %req.path, status = %status, error = %e, "request rejected");
                }
                DocResponse::error(status, e.to_string())
            }
        }
    }

    fn try_handle(&self, req: &DocRequest) -> Result<DocResponse, ServerError> {
        let store_path = self.store_path(req)?;

        if self.is_static(&clean::clean(&req.path)) {
            return self.serve_static(&store_path);
        }

        let token = req.cookie(&self.config.session_cookie);
        let (mut session, mut is_new) = self.sessions.get_or_create(token)?;

        let mut response = match login_flow(self, req, &session)? {
            LoginOutcome::Respond(response) => response,
            LoginOutcome::Continue(headers) => {
                let mut response = self.serve_document(req, &session, &store_path)?;
                response.headers.extend(headers);
                response
            }
            LoginOutcome::NewSession(headers) => {
                (session, is_new) = self.sessions.get_or_create(None)?;
                let mut response = self.serve_document(req, &session, &store_path)?;
                response.headers.extend(headers);
                response
            }
        };

        // a failed login drops the session it just created
        if is_new && self.sessions.get(session.token()).is_some() {
            response = response.with_header(
                header::SET_COOKIE.as_str(),
                format!(
                    "{}={}; Path=/; HttpOnly",
                    self.config.session_cookie,
                    session.token()
                ),
            );
        }
        Ok(response)
    }

    /// Path inside the store: in multi-host mode the host is the first level.
    fn store_path(&self, req: &DocRequest) -> Result<String, ServerError> {
        if !self.config.multi_host {
            return Ok(req.path.clone());
        }
        let host = req.host.as_str();
        if host.is_empty()
            || host.contains('/')
            || host.starts_with(self.config.resolver.hidden_marker)
        {
            return Err(ResolveError::NotFound {
                path: clean::clean(&req.path),
            }
            .into());
        }
        Ok(format!("/{host}/{}", req.path.trim_start_matches('/')))
    }

    /// `path` must be cleaned, so `..` cannot walk out of a static prefix.
    fn is_static(&self, path: &str) -> bool {
        self.config
            .static_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn static_lists(&self, host: &str) -> &dyn StaticLists {
        match self.config.host_static_lists.get(host) {
            Some(lists) if self.config.multi_host => lists,
            _ => &self.config.static_lists,
        }
    }

    /// Raw file, no session, long cache lifetime.
    fn serve_static(&self, store_path: &str) -> Result<DocResponse, ServerError> {
        let node = self.resolver.resolve(store_path, self.static_lists(""))?;
        if let NodeContent::Directory { .. } | NodeContent::RevisionList { .. } = node.content {
            return Err(ResolveError::NotFound {
                path: clean::clean(store_path),
            }
            .into());
        }
        let mime = node.mime.clone().unwrap_or_else(|| DEFAULT_MIME.to_string());
        Ok(DocResponse::ok(mime, node.source)
            .with_header(header::CACHE_CONTROL.as_str(), STATIC_CACHE_CONTROL))
    }

    fn serve_document(
        &self,
        req: &DocRequest,
        session: &Session,
        store_path: &str,
    ) -> Result<DocResponse, ServerError> {
        let mut context = self.assembler.build_context(session, req)?;
        let node = self
            .resolver
            .resolve(store_path, self.static_lists(&req.host))?;
        self.assembler.attach_node(&mut context, req, &node)?;

        let options = RenderOptions::from_request(req);
        let rendered = self.dispatcher.render(&node, &mut context, &options)?;

        let mut response = DocResponse::ok(rendered.mime, rendered.body);
        if let Some(name) = req.param("filename").filter(|n| !n.is_empty()) {
            let ext = Path::new(&node.name())
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let name = name.replace('"', "");
            response = response.with_header(
                header::CONTENT_DISPOSITION.as_str(),
                format!("inline; filename=\"{name}{ext}\""),
            );
        }
        Ok(response)
    }
}

impl std::fmt::Debug for DocServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocServer")
            .field("resolver", &self.resolver)
            .field("sessions", &self.sessions.len())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Load a context tree. A missing file is an empty tree.
fn load_context(path: &Path) -> Result<Tree, ServerError> {
    match fs::read_to_string(path) {
        Ok(text) => notation::parse(&text).map_err(|e| ServerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tree::new()),
        Err(e) => Err(e.into()),
    }
}

/// One base tree per host directory: the global tree merged with the host's
/// own context file.
fn load_host_contexts(root: &Path, base: &Tree) -> Result<HashMap<String, Tree>, ServerError> {
    let mut hosts = HashMap::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        let mut tree = base.deep_copy();
        tree.merge(&load_context(&entry.path().join(CONF_DIR).join(CONTEXT_FILE))?);
        debug!(host = %name, "host context loaded");
        hosts.insert(name, tree);
    }
    Ok(hosts)
}
