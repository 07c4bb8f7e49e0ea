use std::io;
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Accept failed: {0}")]
    AcceptFailure(#[source] io::Error),

    #[error("Malformed request: {0}")]
    RequestMalformed(String),

    #[error("Handler failed: {0}")]
    HandlerFailure(String),

    #[error("Write failed: {0}")]
    WriteFailure(#[source] io::Error),

    #[error("Response already finalized")]
    AlreadyFinalized,

    #[error("Server already listening")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
