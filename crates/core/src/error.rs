//! Unified error types for harbor.
//!
//! Every variant renders as `CODE: message` so hosts can match on the prefix.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline worker and its host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed strategy pattern).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be encoded or decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure: the request never produced a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Install could not store the precache list.
    #[error("PRECACHE_FAILED: {0}")]
    PrecacheFailed(String),

    /// Lifecycle event dispatched in the wrong worker state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),
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

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Network(msg) => (-32004, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::PrecacheFailed(msg) => (-32008, msg.clone()),
            Error::InvalidState(msg) => (-32009, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET https://example.com/".to_string());
        assert!(err.to_string().starts_with("CACHE_MISS"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::PrecacheFailed("/offline returned 404".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32008);
    }
}
