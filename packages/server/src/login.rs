//! The `Login` / `Logout` request parameters.

use std::time::Duration;

use http::header;
use tracing::{info, warn};
use url::form_urlencoded;

use docserve_resolver::clean;

use crate::{DocRequest, DocResponse, DocServer, ServerError, Session};

/// Request parameter that ends the session.
pub(crate) const LOGOUT: &str = "Logout";

/// What the login flow decided for a request.
#[derive(Debug)]
pub(crate) enum LoginOutcome {
    /// Nothing to do, or logged in without a redirect: serve the page. The
    /// headers go on the response.
    Continue(Vec<(String, String)>),
    /// The session was dropped: serve the page with a fresh session.
    NewSession(Vec<(String, String)>),
    /// Answer with this response instead of the page.
    Respond(DocResponse),
}

/// Handle `Logout`, or `Login` with `User` and `Password`.
///
/// A failed login drops the session and redirects to the login page, which
/// gets the requested path as its `redirect` parameter. A successful one sets
/// the session user and the signed identity cookie, then follows `redirect`
/// if given.
pub(crate) fn login_flow(
    server: &DocServer,
    req: &DocRequest,
    session: &Session,
) -> Result<LoginOutcome, ServerError> {
    let identity = server.identity();
    let clear = (header::SET_COOKIE.to_string(), identity.clear_header());

    if req.has_param(LOGOUT) {
        info!(user = %session.user(), "logout");
        server.sessions().remove(session.token());
        return Ok(LoginOutcome::NewSession(vec![clear]));
    }

    if !req.has_param("Login") {
        return Ok(LoginOutcome::Continue(Vec::new()));
    }

    let user = req.param("User").unwrap_or_default();
    let password = req.param("Password").unwrap_or_default();
    if user.is_empty() || !server.identity_provider().validate(user, password) {
        warn!(user, "login failed");
        server.sessions().remove(session.token());
        let redirect: String = form_urlencoded::byte_serialize(req.path.as_bytes()).collect();
        let location = format!("{}?redirect={redirect}", server.config().login_path);
        return Ok(LoginOutcome::Respond(
            DocResponse::redirect(location).with_header(clear.0, clear.1),
        ));
    }

    info!(user, "login");
    session.set_user(user);
    if req.has_param("remember") {
        let minutes = server.config().remember_timeout_minutes;
        session.set_timeout(Duration::from_secs(minutes.saturating_mul(60)));
    }
    let cookie = (header::SET_COOKIE.to_string(), identity.set_header(user));

    match req.param("redirect").filter(|r| !r.is_empty()) {
        Some(target) => Ok(LoginOutcome::Respond(
            DocResponse::redirect(expand_redirect(target, user)).with_header(cookie.0, cookie.1),
        )),
        None => Ok(LoginOutcome::Continue(vec![cookie])),
    }
}

/// Replace `_user` path components of a redirect target with the user name.
///
/// The path is cleaned, so the result always stays on this site: `//host`
/// and `\\host` forms collapse into local paths. A query string is kept.
pub(crate) fn expand_redirect(target: &str, user: &str) -> String {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    let path = path.replace('\\', "/");
    let expanded = clean::components(&path)
        .into_iter()
        .map(|part| if part == "_user" { user.to_string() } else { part })
        .collect::<Vec<_>>()
        .join("/");

    let mut location = clean::clean(&expanded.replace('\\', "/"));
    if path.ends_with('/') && location != "/" {
        location.push('/');
    }
    if let Some(query) = query {
        location.push('?');
        location.push_str(query);
    }
    location
}
