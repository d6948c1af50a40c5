//! The HTTP front end on a real socket.

use std::fs;
use std::sync::Arc;

use docserve_server::{DocServer, HttpServer, ServerConfig};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start(root: &std::path::Path) -> std::net::SocketAddr {
    start_with(
        root,
        ServerConfig {
            identity_key: "k".to_string(),
            ..ServerConfig::default()
        },
    )
    .await
}

async fn start_with(root: &std::path::Path, config: ServerConfig) -> std::net::SocketAddr {
    let server = Arc::new(DocServer::new(root, config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(HttpServer::new(server).serve(listener));
    addr
}

async fn send(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn get_renders_a_template() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.htm"), "hello {{R.name}}").unwrap();
    let addr = start(dir.path()).await;

    let response = send(
        addr,
        "GET /?name=world HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("content-type: text/html"));
    assert!(response.contains("set-cookie: session="));
    assert!(response.ends_with("hello world"));
}

#[tokio::test]
async fn form_body_is_decoded() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("echo.htm"), "{{R.msg}}").unwrap();
    let addr = start(dir.path()).await;

    let body = "msg=hi+there";
    let request = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let response = send(addr, &request).await;
    assert!(response.ends_with("hi there"), "{response}");
}

#[tokio::test]
async fn missing_document_is_404() {
    let dir = TempDir::new().unwrap();
    let addr = start(dir.path()).await;

    let response = send(
        addr,
        "GET /nothing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{response}");
}

#[tokio::test]
async fn oversized_body_is_413() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("echo.htm"), "{{R.msg}}").unwrap();
    let config = ServerConfig {
        identity_key: "k".to_string(),
        max_body_bytes: 16,
        ..ServerConfig::default()
    };
    let addr = start_with(dir.path(), config).await;

    let post = |body: String| {
        format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        )
    };

    let response = send(addr, &post(format!("msg={}", "x".repeat(64)))).await;
    assert!(response.starts_with("HTTP/1.1 413 "), "{response}");

    let response = send(addr, &post("msg=short".to_string())).await;
    assert!(response.ends_with("short"), "{response}");
}
