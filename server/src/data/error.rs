//! Leaf error types for the data layer, one per subsystem.

use thiserror::Error;

/// Errors from the per-day local SQLite store (§4.4).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid date folder: {0}")]
    InvalidDate(String),

    #[error("schema migration failed: {0}")]
    SchemaMigration(String),
}

/// Errors from the S3-compatible remote sync backend (§4.5).
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote object not found: {0}")]
    NotFound(String),

    #[error("upload verification failed for {0}: HEAD did not confirm the object")]
    VerificationFailed(String),
}

/// Errors from keyword rule loading and parsing (§4.3).
///
/// A missing or unreadable rule file is not an error (the caller falls back
/// to empty rules and logs a warning); this type exists for malformed content
/// that the grammar cannot recover from.
#[derive(Error, Debug)]
pub enum KeywordRuleError {
    #[error("io error reading rule file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the in-memory TTL cache (§4.9).
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the tool dispatcher (§4.10) to its transport layer.
///
/// `code()` maps each variant onto one of the four declared tool-error codes
/// plus `INTERNAL_ERROR` as a catch-all, the way `mcp_err` in the teacher's
/// `tools.rs` maps repository errors onto a single `McpError` shape.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("no data found: {0}")]
    DataNotFound(String),

    #[error("file parse error: {0}")]
    FileParseError(String),

    #[error("crawl task error: {0}")]
    CrawlTaskError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    DateRange(#[from] crate::domain::time::DateRangeError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) | Self::InvalidArguments(_) | Self::DateRange(_) => "INVALID_ARGUMENT",
            Self::DataNotFound(_) => "DATA_NOT_FOUND",
            Self::FileParseError(_) => "FILE_PARSE_ERROR",
            Self::CrawlTaskError(_) => "CRAWL_TASK_ERROR",
            Self::Storage(_) | Self::Remote(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_wraps_storage_error_transparently() {
        let err: DispatchError = StorageError::InvalidDate("2025-13-40".into()).into();
        assert!(err.to_string().contains("2025-13-40"));
    }

    #[test]
    fn unknown_tool_message_includes_the_name() {
        let err = DispatchError::UnknownTool("nonexistent_tool".into());
        assert_eq!(err.to_string(), "unknown tool: nonexistent_tool");
    }
}
