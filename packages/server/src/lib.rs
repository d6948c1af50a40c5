//! A document server.
//!
//! Requests flow through a fixed pipeline:
//!
//! ```text
//! request -> session -> context -> resolve -> render -> response
//! ```
//!
//! - [`SessionRegistry`] finds or creates the client's [`Session`]
//! - [`ContextAssembler`] builds the context tree for the request
//! - [`docserve_resolver::Resolver`] maps the URL onto the document root
//! - [`Dispatcher`] renders the resolved node through templates
//!
//! [`DocServer`] ties these together and [`HttpServer`] puts it on a socket.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docserve_server::{DocServer, HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), docserve_server::ServerError> {
//! let server = DocServer::new("site/", ServerConfig::default())?;
//! HttpServer::new(Arc::new(server))
//!     .run("127.0.0.1:8080".parse().unwrap())
//!     .await
//! # }
//! ```

mod assemble;
pub mod config;
mod dispatch;
mod error;
mod http_server;
mod identity;
mod login;
mod request;
mod server;
mod session;

pub use assemble::{url_base, ContextAssembler, REQUEST_KEY};
pub use config::{ServerConfig, TemplateSource};
pub use dispatch::{Dispatcher, RenderOptions, Rendered, DEFAULT_MIME};
pub use error::ServerError;
pub use http_server::HttpServer;
pub use identity::{resolve_identity, IdentityCookie, IdentityProvider, PasswordTable, ANONYMOUS};
pub use request::{parse_cookies, DocRequest, DocResponse};
pub use server::{DocServer, STATIC_CACHE_CONTROL};
pub use session::{Session, SessionRegistry};
