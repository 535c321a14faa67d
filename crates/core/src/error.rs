//! Unified error types for souk.
//!
//! Display strings carry a stable `CODE:` prefix that is also mapped onto
//! numeric MCP error codes.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the souk worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Only successful responses may enter a cache partition.
    #[error("NOT_CACHEABLE: status {0}")]
    NotCacheable(u16),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Record targets an object store that was never created.
    #[error("UNKNOWN_OBJECT_STORE: {0}")]
    UnknownObjectStore(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network request failed before a response arrived.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Payload could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
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
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::NotCacheable(status) => (-32003, format!("status {status} is not cacheable")),
            Error::UnknownObjectStore(name) => (-32004, format!("unknown object store: {name}")),
            Error::InvalidUrl(msg) => (-32005, msg.clone()),
            Error::Network(msg) => (-32006, msg.clone()),
            Error::FetchTimeout(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::Serialization(msg) => (-32009, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
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
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_not_cacheable_display() {
        let err = Error::NotCacheable(500);
        assert_eq!(err.to_string(), "NOT_CACHEABLE: status 500");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::UnknownObjectStore("drafts".into()).into();
        assert_eq!(mcp_err.code.0, -32004);
        assert!(mcp_err.message.contains("drafts"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
