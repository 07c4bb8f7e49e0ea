//! Pluggable logging sink.
//!
//! The server reports request and lifecycle events through a [`LogSink`]
//! injected at setup. Connection threads call it concurrently, so
//! implementations must be `Send + Sync`.

use chrono::Local;
use std::sync::Arc;

/// Two-method logging capability used by the server
pub trait LogSink: Send + Sync {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Shared handle to a sink
pub type SharedLogSink = Arc<dyn LogSink>;

/// Prints `yyyy-MM-dd HH:mm:ss[LEVEL] message` lines to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl LogSink for ConsoleSink {
    fn info(&self, msg: &str) {
        println!("{}[INFO] {}", Self::timestamp(), msg);
    }

    fn error(&self, msg: &str) {
        println!("{}[ERROR] {}", Self::timestamp(), msg);
    }
}

/// Forwards to the `log` facade under the `micro_route_server` target
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacadeSink;

impl LogSink for LogFacadeSink {
    fn info(&self, msg: &str) {
        log::info!(target: "micro_route_server", "{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!(target: "micro_route_server", "{}", msg);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn info(&self, _msg: &str) {}

    fn error(&self, _msg: &str) {}
}
