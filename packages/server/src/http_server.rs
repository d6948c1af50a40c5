//! HTTP/1.1 front end for [`DocServer`].
//!
//! One tokio task per connection. Request bodies are collected in full, up to
//! `max_body_bytes`, then the document pipeline runs on the blocking pool
//! since it reads the store with synchronous file I/O.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::{DocRequest, DocResponse, DocServer, ServerError};

/// HTTP server around a shared [`DocServer`].
#[derive(Debug, Clone)]
pub struct HttpServer {
    server: Arc<DocServer>,
    max_body: usize,
}

impl HttpServer {
    pub fn new(server: Arc<DocServer>) -> Self {
        let max_body = server.config().max_body_bytes;
        Self { server, max_body }
    }

    /// Bind `addr` and serve until the task is dropped.
    pub async fn run(self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = Arc::clone(&self.server);
            let max_body = self.max_body;

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { Self::handle_request(server, req, max_body).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!(%peer, "Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(
        server: Arc<DocServer>,
        req: Request<Incoming>,
        max_body: usize,
    ) -> Result<Response<Full<Bytes>>, ServerError> {
        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, max_body).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                tracing::warn!(path = %parts.uri.path(), limit = max_body, "request body too large");
                return Ok(into_hyper(DocResponse::error(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "request body too large",
                )));
            }
            Err(e) => match e.downcast::<hyper::Error>() {
                Ok(e) => return Err((*e).into()),
                Err(e) => {
                    return Ok(into_hyper(DocResponse::error(
                        StatusCode::BAD_REQUEST,
                        e.to_string(),
                    )))
                }
            },
        };
        let request = DocRequest::from_parts(parts.method, &parts.uri, &parts.headers, &body);

        let response = match tokio::task::spawn_blocking(move || server.handle(&request)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("request handler panicked: {}", e);
                DocResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };
        Ok(into_hyper(response))
    }
}

fn into_hyper(response: DocResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Full::new(response.body)).unwrap_or_else(|e| {
        tracing::error!("invalid response header: {}", e);
        let mut fallback = Response::new(Full::new(Bytes::from_static(b"internal error")));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
