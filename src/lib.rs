//! A minimal thread-per-connection HTTP/1.1 server.
//!
//! Each accepted connection is read once, parsed into a [`Request`], resolved
//! against an ordered list of `/`-segmented path patterns (`/users/:id`) and
//! handed to a handler that builds and finalizes a [`Response`]. The
//! connection is closed after that single response.

pub mod acceptor;
pub mod config;
pub mod connection;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod html;
pub mod http;
pub mod logging;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;

/// Re-exports of common components for easier access
pub use acceptor::ConnectionAcceptor;
pub use config::ServerConfig;
pub use connection::Connection;
pub use context::RouterContext;
pub use dispatcher::{not_found_handler, Dispatcher};
pub use error::{ServerError, ServerResult};
pub use html::{HtmlBuilder, HtmlNode};
pub use http::{parse_cookies, parse_query, Request, Status};
pub use logging::{ConsoleSink, LogFacadeSink, LogSink, NullSink, SharedLogSink};
pub use response::{Response, Transport};
pub use router::{match_path, HandlerFn, PathMatch, PathParams, Route, Router};
pub use server::{HttpServer, ServerState};
pub use static_files::{content_type_for, static_file_handler};
