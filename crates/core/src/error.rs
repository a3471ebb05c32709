//! Unified error types for pagetally.
//!
//! Display strings carry a stable upper-case code prefix so callers and
//! logs can match on the failure class without parsing the message.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Failure reported by a [`Fetcher`](crate::fetch::Fetcher).
///
/// `status` is set when the remote answered with a non-success HTTP status,
/// and is `None` for transport-level failures (DNS, connect, timeout, size).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    /// Remote answered with a non-success HTTP status.
    pub fn status(code: u16) -> Self {
        Self { status: Some(code), message: format!("status {code}") }
    }

    /// Request never produced a usable response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }
}

/// Unified error types for pagetally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key-value store could not serve the request.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// SQLite backend operation failed.
    #[error("STORE_UNAVAILABLE: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// TTL must be a positive number of seconds.
    #[error("INVALID_TTL: {0} (must be a positive number of seconds)")]
    InvalidTtl(i64),

    /// The fetch collaborator failed.
    #[error("FETCH_ERROR: {0}")]
    Fetch(#[from] FetchError),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error originated in the key-value store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::Database(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidTtl(_) => (-32602, err.to_string()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Fetch(e) => (-32008, e.message.clone()),
            Error::StoreUnavailable(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
