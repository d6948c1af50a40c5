//! End-to-end runs of the document pipeline against a temporary site.

use std::fs;
use std::path::Path;

use docserve_server::{
    DocRequest, DocResponse, DocServer, ServerConfig, TemplateSource, STATIC_CACHE_CONTROL,
};
use http::StatusCode;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, ".conf/context.json", r#"{"site": {"title": "Docs"}}"#);
    write(root, "tpl/readme.htm", "<main>{{path.content}}</main>");
    write(root, "tpl/markdown.htm", "<article>{{path.content}}</article>");
    write(root, "tpl/dir.htm", "dir {{R.urlbase}}");
    write(root, "index.htm", "<h1>{{site.title}}</h1> {{user}} {{R.url}}");
    write(root, "docs/readme.md", "# Guide\n");
    write(root, "docs/list/a.txt", "a");
    write(root, "_user/notes.md", "# Notes\n");
    write(root, "_user/index.htm", "home of {{R.user}} at {{R.urlbase}}");
    write(root, "echo.htm", "{{R.msg}}|{{R.item.name}}");
    write(root, "export.htm", "{{mime = text/csv}}a,b");
    write(root, "blank.htm", "{{R.nothing}}");
    write(root, "static/app.css", "body {}");
    write(root, "report.csv", "user\n{{user}}\n");
    dir
}

fn config() -> ServerConfig {
    let mut config = ServerConfig {
        identity_key: "test-key".to_string(),
        static_prefixes: vec!["/static/".to_string()],
        ..ServerConfig::default()
    };
    for name in ["readme", "markdown", "dir"] {
        config.templates.insert(
            name.to_string(),
            TemplateSource::Path(format!("tpl/{name}.htm")),
        );
    }
    config.users.insert(
        "alice".to_string(),
        docserve_server::PasswordTable::digest("wonderland"),
    );
    config
}

fn server(root: &Path) -> DocServer {
    DocServer::new(root, config()).unwrap()
}

fn body(r: &DocResponse) -> String {
    String::from_utf8(r.body.to_vec()).unwrap()
}

fn session_cookie(r: &DocResponse) -> Option<String> {
    r.headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
        .find_map(|(_, v)| v.strip_prefix("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[test]
fn index_page_gets_base_context_and_identity() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/"));
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.content_type(), Some("text/html"));
    assert_eq!(body(&r), "<h1>Docs</h1> anonymous /");
    assert!(session_cookie(&r).is_some());
}

#[test]
fn session_is_reused_through_its_cookie() {
    let dir = site();
    let s = server(dir.path());

    let first = s.handle(&DocRequest::get("/"));
    let token = session_cookie(&first).unwrap();

    let second = s.handle(&DocRequest::get("/").with_cookie("session", token));
    assert_eq!(second.status, StatusCode::OK);
    assert!(session_cookie(&second).is_none());
    assert_eq!(s.sessions().len(), 1);
}

#[test]
fn readme_and_notes_use_different_wrappers() {
    let dir = site();
    let s = server(dir.path());

    let readme = s.handle(&DocRequest::get("/docs/"));
    assert_eq!(body(&readme), "<main><h1>Guide</h1>\n</main>");

    let notes = s.handle(&DocRequest::get("/alice/notes"));
    assert_eq!(body(&notes), "<article><h1>Notes</h1>\n</article>");
}

#[test]
fn path_variables_and_urlbase_reach_the_template() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/bob/"));
    assert_eq!(body(&r), "home of bob at /bob/");

    let listing = s.handle(&DocRequest::get("/docs/list"));
    assert_eq!(body(&listing), "dir /docs/list/");
}

#[test]
fn parameters_and_structured_parameters() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(
        &DocRequest::post("/echo")
            .with_param("msg", "hello")
            .with_param("item._json", r#"{"name": "widget"}"#),
    );
    assert_eq!(body(&r), "hello|widget");

    let bad = s.handle(&DocRequest::post("/echo").with_param("item._json", "{"));
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[test]
fn template_can_set_the_mime_type() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/export"));
    assert_eq!(r.content_type(), Some("text/csv"));
    assert_eq!(body(&r), "a,b");
}

#[test]
fn inline_csv_template() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/report.csv"));
    assert_eq!(body(&r), "user\nanonymous\n");
}

#[test]
fn raw_mode_and_filename() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(
        &DocRequest::get("/docs/readme.md")
            .with_param("m", "raw")
            .with_param("filename", "guide"),
    );
    assert_eq!(body(&r), "# Guide\n");
    assert_eq!(
        r.header("content-disposition"),
        Some("inline; filename=\"guide.md\"")
    );
}

#[test]
fn error_statuses() {
    let dir = site();
    let s = server(dir.path());

    assert_eq!(
        s.handle(&DocRequest::get("/.conf/context.json")).status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        s.handle(&DocRequest::get("/docs/missing")).status,
        StatusCode::NOT_FOUND
    );

    let empty = s.handle(&DocRequest::get("/blank"));
    assert_eq!(empty.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&empty), "Empty content");

    // no "log" template configured
    write(dir.path(), "server.log", "line\n");
    let r = s.handle(&DocRequest::get("/server.log"));
    assert_eq!(r.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body(&r).contains("template not found: log"));
}

#[test]
fn session_capacity_returns_429() {
    let dir = site();
    let config = ServerConfig {
        max_sessions: 2,
        ..config()
    };
    let s = DocServer::new(dir.path(), config).unwrap();

    let a = session_cookie(&s.handle(&DocRequest::get("/"))).unwrap();
    assert!(session_cookie(&s.handle(&DocRequest::get("/"))).is_some());

    let full = s.handle(&DocRequest::get("/"));
    assert_eq!(full.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(s.sessions().len(), 2);

    // known clients are still served
    let ok = s.handle(&DocRequest::get("/").with_cookie("session", a));
    assert_eq!(ok.status, StatusCode::OK);
}

#[test]
fn static_prefix_skips_sessions() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/static/app.css"));
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.content_type(), Some("text/css"));
    assert_eq!(r.header("cache-control"), Some(STATIC_CACHE_CONTROL));
    assert_eq!(body(&r), "body {}");
    assert!(s.sessions().is_empty());
}

#[test]
fn dot_segments_cannot_leave_a_static_prefix() {
    let dir = site();
    write(dir.path(), "secret.htm", "{{user}} private");
    let s = server(dir.path());

    let r = s.handle(&DocRequest::get("/static/../secret.htm"));
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.header("cache-control"), None);
    assert_eq!(body(&r), "anonymous private");
    assert_eq!(s.sessions().len(), 1);

    let r = s.handle(&DocRequest::get("/static/./app.css"));
    assert_eq!(r.header("cache-control"), Some(STATIC_CACHE_CONTROL));
}

#[test]
fn sessions_do_not_share_context() {
    let dir = site();
    let s = server(dir.path());

    let a = s.handle(&DocRequest::get("/echo").with_param("msg", "from a"));
    let b = s.handle(&DocRequest::get("/echo"));
    assert_eq!(body(&a), "from a|");
    assert_eq!(s.sessions().len(), 2);
    // b's request subtree never saw a's parameter
    assert_eq!(body(&b), "|");
    assert!(s.assembler().base().get("R").is_none());
}

#[test]
fn login_sets_identity_and_logout_clears_it() {
    let dir = site();
    let s = server(dir.path());

    let login = s.handle(
        &DocRequest::post("/")
            .with_param("Login", "1")
            .with_param("User", "alice")
            .with_param("Password", "wonderland")
            .with_param("redirect", "_user"),
    );
    assert_eq!(login.status, StatusCode::FOUND);
    assert_eq!(login.header("location"), Some("/alice"));
    let token = session_cookie(&login).unwrap();
    let identity = login
        .headers
        .iter()
        .find_map(|(_, v)| v.strip_prefix("userid="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    // the session remembers the user
    let page = s.handle(&DocRequest::get("/").with_cookie("session", token.clone()));
    assert_eq!(body(&page), "<h1>Docs</h1> alice /");

    // the identity cookie alone is enough in a new session
    let page = s.handle(&DocRequest::get("/").with_cookie("userid", identity));
    assert_eq!(body(&page), "<h1>Docs</h1> alice /");

    let logout = s.handle(
        &DocRequest::get("/")
            .with_param("Logout", "1")
            .with_cookie("session", token.clone()),
    );
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(body(&logout), "<h1>Docs</h1> anonymous /");
    assert!(logout
        .headers
        .iter()
        .any(|(_, v)| v.starts_with("userid=;")));
    let fresh = session_cookie(&logout).unwrap();
    assert_ne!(fresh, token);
}

fn identity_cookie(r: &DocResponse) -> String {
    r.headers
        .iter()
        .find_map(|(_, v)| v.strip_prefix("userid="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

fn login_as_alice(s: &DocServer) -> DocResponse {
    s.handle(
        &DocRequest::post("/")
            .with_param("Login", "1")
            .with_param("User", "alice")
            .with_param("Password", "wonderland"),
    )
}

#[test]
fn logout_wins_over_the_identity_cookie() {
    let dir = site();
    let s = server(dir.path());

    let login = login_as_alice(&s);
    assert_eq!(body(&login), "<h1>Docs</h1> alice /");
    let token = session_cookie(&login).unwrap();
    let identity = identity_cookie(&login);

    let logout = s.handle(
        &DocRequest::get("/")
            .with_param("Logout", "1")
            .with_cookie("session", token)
            .with_cookie("userid", identity),
    );
    assert_eq!(body(&logout), "<h1>Docs</h1> anonymous /");

    // the fresh session is not tied to alice either
    let fresh = session_cookie(&logout).unwrap();
    let page = s.handle(&DocRequest::get("/").with_cookie("session", fresh));
    assert_eq!(body(&page), "<h1>Docs</h1> anonymous /");
}

#[test]
fn login_redirect_stays_on_site() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(
        &DocRequest::post("/")
            .with_param("Login", "1")
            .with_param("User", "alice")
            .with_param("Password", "wonderland")
            .with_param("redirect", "//evil.example/x"),
    );
    assert_eq!(r.status, StatusCode::FOUND);
    assert_eq!(r.header("location"), Some("/evil.example/x"));
}

#[test]
fn huge_timeouts_saturate() {
    let dir = site();
    let config = ServerConfig {
        cookie_max_age_days: u64::MAX,
        session_timeout_minutes: u64::MAX,
        remember_timeout_minutes: u64::MAX,
        ..config()
    };
    let s = DocServer::new(dir.path(), config).unwrap();

    let r = s.handle(
        &DocRequest::post("/")
            .with_param("Login", "1")
            .with_param("User", "alice")
            .with_param("Password", "wonderland")
            .with_param("remember", "1"),
    );
    assert_eq!(r.status, StatusCode::OK);
    assert!(!identity_cookie(&r).is_empty());
}

#[test]
fn failed_login_redirects_to_login_page() {
    let dir = site();
    let s = server(dir.path());

    let r = s.handle(
        &DocRequest::post("/docs/")
            .with_param("Login", "1")
            .with_param("User", "alice")
            .with_param("Password", "wrong"),
    );
    assert_eq!(r.status, StatusCode::FOUND);
    assert_eq!(r.header("location"), Some("/login?redirect=%2Fdocs%2F"));
    assert!(s.sessions().is_empty());
}

#[test]
fn multi_host_serves_a_tree_per_host() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, ".conf/context.json", r#"{"site": {"title": "Global"}}"#);
    write(root, "a.example/index.htm", "A {{site.title}} {{R.host}}");
    write(root, "b.example/.conf/context.json", r#"{"site": {"title": "Bee"}}"#);
    write(root, "b.example/index.htm", "B {{site.title}}");
    write(root, "b.example/docs/page.htm", "{{R.urlbase}}");

    let config = ServerConfig {
        multi_host: true,
        identity_key: "k".to_string(),
        ..ServerConfig::default()
    };
    let s = DocServer::new(root, config).unwrap();

    let a = s.handle(&DocRequest::get("/").with_host("a.example"));
    assert_eq!(body(&a), "A Global a.example");

    let b = s.handle(&DocRequest::get("/").with_host("b.example"));
    assert_eq!(body(&b), "B Bee");

    let page = s.handle(&DocRequest::get("/docs/page").with_host("b.example"));
    assert_eq!(body(&page), "/docs/");

    let none = s.handle(&DocRequest::get("/").with_host("c.example"));
    assert_eq!(none.status, StatusCode::NOT_FOUND);
}

#[test]
fn missing_template_file_fails_startup() {
    let dir = site();
    let mut config = config();
    config.templates.insert(
        "log".to_string(),
        TemplateSource::Path("tpl/missing.htm".to_string()),
    );
    assert!(DocServer::new(dir.path(), config).is_err());
}
