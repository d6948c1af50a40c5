//! Transport-neutral request and response types.

use std::collections::HashMap;

use bytes::Bytes;
use http::{header, HeaderMap, Method, StatusCode, Uri};
use url::form_urlencoded;

/// A request as the document pipeline sees it.
#[derive(Debug, Clone, Default)]
pub struct DocRequest {
    pub method: Method,
    /// URL path, not yet cleaned.
    pub path: String,
    /// Host name without port.
    pub host: String,
    /// Query and form parameters, in arrival order. Keys may repeat.
    pub params: Vec<(String, String)>,
    pub cookies: HashMap<String, String>,
}

impl DocRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Build from HTTP request parts. Form bodies of POST and PUT requests
    /// are decoded into parameters after the query string.
    pub fn from_parts(method: Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        let mut request = Self {
            method,
            path: uri.path().to_string(),
            ..Default::default()
        };

        if let Some(query) = uri.query() {
            request.add_form(query.as_bytes());
        }

        if let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
            request.host = strip_port(host).to_ascii_lowercase();
        }

        for value in headers.get_all(header::COOKIE) {
            if let Ok(value) = value.to_str() {
                request.cookies.extend(parse_cookies(value));
            }
        }

        let is_form = headers
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form && (request.method == Method::POST || request.method == Method::PUT) {
            request.add_form(body);
        }

        request
    }

    fn add_form(&mut self, encoded: &[u8]) {
        self.params.extend(
            form_urlencoded::parse(encoded).map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    /// First value of a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literals keep their colons
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split(':').next().unwrap_or(host)
}

/// Parse a `Cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        (!name.is_empty()).then(|| (name.to_string(), value.trim().trim_matches('"').to_string()))
    })
}

/// A response produced by the document pipeline.
#[derive(Debug, Clone)]
pub struct DocResponse {
    pub status: StatusCode,
    /// Headers in insertion order. `Set-Cookie` may repeat.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl DocResponse {
    pub fn ok(mime: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![(header::CONTENT_TYPE.to_string(), mime.into())],
            body: body.into(),
        }
    }

    /// Plain text error page.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![(
                header::CONTENT_TYPE.to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: Bytes::from(message.into()),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            headers: vec![(header::LOCATION.to_string(), location.into())],
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }
}
