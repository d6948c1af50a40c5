//! Builds the context tree a request is rendered against.

use std::collections::HashMap;

use docserve_resolver::{clean, ResolvedNode};
use docserve_tree::{notation, Key, Tree};
use tracing::warn;

use crate::identity::{resolve_identity, IdentityCookie};
use crate::login::LOGOUT;
use crate::{DocRequest, ServerError, Session};

/// Name of the request-scoped subtree.
pub const REQUEST_KEY: &str = "R";

/// Assembles per-request context trees.
///
/// Holds the base trees loaded at startup: the global one, and in multi-host
/// mode one per host (already merged over the global tree). Base trees are
/// never handed out by reference; sessions get their own copy.
#[derive(Debug)]
pub struct ContextAssembler {
    base: Tree,
    hosts: HashMap<String, Tree>,
    multi_host: bool,
    home: String,
    structured_suffix: String,
    default_user: Option<String>,
    identity: IdentityCookie,
}

impl ContextAssembler {
    pub fn new(base: Tree, identity: IdentityCookie) -> Self {
        Self {
            base,
            hosts: HashMap::new(),
            multi_host: false,
            home: "/".to_string(),
            structured_suffix: "._json".to_string(),
            default_user: None,
            identity,
        }
    }

    /// Serve per-host base trees. Hosts without a tree use the global one.
    pub fn with_hosts(mut self, hosts: HashMap<String, Tree>) -> Self {
        self.hosts = hosts;
        self.multi_host = true;
        self
    }

    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_structured_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.structured_suffix = suffix.into();
        self
    }

    pub fn with_default_user(mut self, user: Option<String>) -> Self {
        self.default_user = user;
        self
    }

    pub fn base(&self) -> &Tree {
        &self.base
    }

    fn base_for(&self, host: &str) -> &Tree {
        if self.multi_host {
            self.hosts.get(host).unwrap_or(&self.base)
        } else {
            &self.base
        }
    }

    /// Build the context for one request.
    ///
    /// The session tree is created from the base tree on first use and
    /// receives the resolved identity under `user`. The returned tree is a
    /// copy of the session tree with a fresh `R` subtree holding the request
    /// URL, home, host and parameters.
    pub fn build_context(&self, session: &Session, req: &DocRequest) -> Result<Tree, ServerError> {
        // a logout request no longer speaks for the cookie's user
        let cookie_user = req
            .cookie(self.identity.name())
            .filter(|_| !req.has_param(LOGOUT))
            .and_then(|value| self.identity.verify(value));
        let user = resolve_identity(cookie_user, &session.user(), self.default_user.as_deref());
        session.set_user(user.as_str());

        let mut context = session.with_tree(
            || self.base_for(&req.host).deep_copy(),
            |tree| -> Result<Tree, ServerError> {
                tree.set("user", user.as_str())?;
                Ok(tree.clone())
            },
        )?;

        let r = context.create(REQUEST_KEY)?;
        for (name, value) in &req.params {
            if let Some(key) = name.strip_suffix(&self.structured_suffix) {
                if key.is_empty() {
                    continue;
                }
                let tree = notation::parse(value).map_err(|e| ServerError::InvalidParameter {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
                r.set(key, tree)?;
            } else if let Err(e) = r.append(name.as_str(), value.as_str()) {
                // e.g. both `a=1` and `a.b=2`
                warn!(param = %name, error = %e, "parameter skipped");
            }
        }

        // written last so parameters cannot shadow them
        r.set("url", clean::clean(&req.path))?;
        r.set("home", self.home.as_str())?;
        if self.multi_host {
            r.set("host", req.host.as_str())?;
        }

        Ok(context)
    }

    /// Add what resolution learned to the request subtree: the URL base for
    /// relative links, and the captured path parameters.
    pub fn attach_node(
        &self,
        context: &mut Tree,
        req: &DocRequest,
        node: &ResolvedNode,
    ) -> Result<(), ServerError> {
        // in multi-host mode the host directory is the first level
        let depth = if self.multi_host {
            node.dir_depth.saturating_sub(1)
        } else {
            node.dir_depth
        };

        let request = Key::single(REQUEST_KEY);
        context.set(request.join(&Key::single("urlbase")), url_base(&req.path, depth))?;
        for (name, value) in &node.params {
            context.set(request.join(&Key::parse(name)), value.as_str())?;
        }
        Ok(())
    }
}

/// `/` followed by the first `depth` components of the cleaned URL path.
pub fn url_base(path: &str, depth: usize) -> String {
    let components = clean::components(path);
    let depth = depth.min(components.len());
    if depth == 0 {
        return "/".to_string();
    }
    format!("/{}/", components[..depth].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionRegistry;
    use std::time::Duration;

    fn identity() -> IdentityCookie {
        IdentityCookie::new("userid", b"k".to_vec(), Duration::from_secs(60))
    }

    fn base() -> Tree {
        let mut t = Tree::new();
        t.set("site.title", "Docs").unwrap();
        t
    }

    fn session() -> std::sync::Arc<Session> {
        SessionRegistry::new(10, Duration::from_secs(60))
            .get_or_create(None)
            .unwrap()
            .0
    }

    #[test]
    fn url_bases() {
        assert_eq!(url_base("/", 0), "/");
        assert_eq!(url_base("/docs/guide", 1), "/docs/");
        assert_eq!(url_base("/a/b/c", 2), "/a/b/");
        assert_eq!(url_base("/a", 5), "/a/");
        assert_eq!(url_base("//a/../b/c", 1), "/b/");
    }

    #[test]
    fn request_subtree() {
        let a = ContextAssembler::new(base(), identity()).with_home("/home/");
        let s = session();
        let req = DocRequest::get("/docs//guide")
            .with_param("q", "x")
            .with_param("tag", "a")
            .with_param("tag", "b");

        let ctx = a.build_context(&s, &req).unwrap();
        assert_eq!(ctx.text("R.url"), "/docs/guide");
        assert_eq!(ctx.text("R.home"), "/home/");
        assert_eq!(ctx.text("R.q"), "x");
        assert_eq!(ctx.text("R.tag.1"), "b");
        assert_eq!(ctx.text("site.title"), "Docs");
        assert!(ctx.get("R.host").is_none());
    }

    #[test]
    fn parameters_do_not_shadow_request_keys() {
        let a = ContextAssembler::new(base(), identity()).with_hosts(HashMap::new());
        let s = session();
        let req = DocRequest::get("/docs")
            .with_host("docs.example")
            .with_param("url", "x")
            .with_param("home", "/elsewhere")
            .with_param("host", "evil.example");

        let ctx = a.build_context(&s, &req).unwrap();
        assert_eq!(ctx.get("R.url"), Some(&docserve_tree::Value::from("/docs")));
        assert_eq!(ctx.text("R.home"), "/");
        assert_eq!(ctx.text("R.host"), "docs.example");
    }

    #[test]
    fn logout_request_ignores_identity_cookie() {
        let a = ContextAssembler::new(base(), identity());
        let s = session();
        let req = DocRequest::get("/")
            .with_param("Logout", "")
            .with_cookie("userid", identity().sign("alice"));

        let ctx = a.build_context(&s, &req).unwrap();
        assert_eq!(ctx.text("user"), crate::ANONYMOUS);
        assert_eq!(s.user(), crate::ANONYMOUS);
    }

    #[test]
    fn expired_identity_cookie_is_ignored() {
        let a = ContextAssembler::new(base(), identity());
        let s = session();
        let req = DocRequest::get("/").with_cookie("userid", identity().sign_at("alice", 0));

        let ctx = a.build_context(&s, &req).unwrap();
        assert_eq!(ctx.text("user"), crate::ANONYMOUS);
    }

    #[test]
    fn request_subtree_is_not_kept_in_the_session() {
        let a = ContextAssembler::new(base(), identity());
        let s = session();

        let first = a
            .build_context(&s, &DocRequest::get("/").with_param("only", "once"))
            .unwrap();
        assert_eq!(first.text("R.only"), "once");

        let second = a.build_context(&s, &DocRequest::get("/")).unwrap();
        assert!(second.get("R.only").is_none());
        assert!(a.base().get("R").is_none());
    }

    #[test]
    fn structured_parameter_matches_direct_parse() {
        let a = ContextAssembler::new(base(), identity());
        let s = session();
        let text = r#"{"name": "widget", "size": {"w": 2, "h": 3}}"#;
        let req = DocRequest::post("/").with_param("item._json", text);

        let ctx = a.build_context(&s, &req).unwrap();
        let parsed = notation::parse(text).unwrap();
        assert_eq!(ctx.node("R.item"), Some(&parsed));
        assert_eq!(ctx.text("R.item.size.h"), "3");
    }

    #[test]
    fn malformed_structured_parameter_is_rejected() {
        let a = ContextAssembler::new(base(), identity());
        let s = session();
        let req = DocRequest::post("/").with_param("item._json", "{oops");
        let err = a.build_context(&s, &req).unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn identity_from_cookie_then_session_then_default() {
        let a = ContextAssembler::new(base(), identity()).with_default_user(Some("guest".into()));
        let s = session();

        let ctx = a.build_context(&s, &DocRequest::get("/")).unwrap();
        assert_eq!(ctx.text("user"), "guest");

        let signed = identity().sign("alice");
        let req = DocRequest::get("/").with_cookie("userid", signed);
        let ctx = a.build_context(&s, &req).unwrap();
        assert_eq!(ctx.text("user"), "alice");

        // remembered on the session
        let ctx = a.build_context(&s, &DocRequest::get("/")).unwrap();
        assert_eq!(ctx.text("user"), "alice");

        // a forged cookie is ignored
        let other = session();
        let req = DocRequest::get("/").with_cookie("userid", "mallory|00");
        let ctx = a.build_context(&other, &req).unwrap();
        assert_eq!(ctx.text("user"), "guest");
    }

    #[test]
    fn per_host_base_trees() {
        let mut host = base();
        host.set("site.title", "Host Docs").unwrap();
        let a = ContextAssembler::new(base(), identity())
            .with_hosts(HashMap::from([("docs.example".to_string(), host)]));

        let ctx = a
            .build_context(&session(), &DocRequest::get("/").with_host("docs.example"))
            .unwrap();
        assert_eq!(ctx.text("site.title"), "Host Docs");
        assert_eq!(ctx.text("R.host"), "docs.example");

        let ctx = a
            .build_context(&session(), &DocRequest::get("/").with_host("other"))
            .unwrap();
        assert_eq!(ctx.text("site.title"), "Docs");
    }
}
