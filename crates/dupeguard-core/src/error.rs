//! Crate-wide error type.

/// Errors surfaced by the duplicate-detection engine.
///
/// Embedding failures never produce an [`EngineError`] — they degrade to
/// zero vectors / zeroed score components and the request proceeds. Only
/// index failures, invariant violations, and timeouts raise an error here.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad input: out-of-range coordinates, description length, photo count, etc.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// No such report, feedback subject, or archive entry.
    #[error("not found: {0}")]
    NotFound(String),

    /// An idempotency or state-machine invariant would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The candidate index (or an external embedding provider) is unavailable.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The operation's deadline elapsed before it could complete.
    #[error("operation timed out")]
    Timeout,

    /// Anything else — treated as a bug or an unrecoverable storage error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => {
                EngineError::NotFound("no matching row".to_string())
            }
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                EngineError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            other => EngineError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl From<rusqlite::types::FromSqlError> for EngineError {
    fn from(err: rusqlite::types::FromSqlError) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}
