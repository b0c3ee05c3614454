//! Shared primitives for all Rust crates in fitgate.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across fitgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Result type returned by every key-value store operation.
pub type StoreResult<T> = Result<T, TransportError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure talking to the networked key-value store.
///
/// None of these ever reach callers of the rate limiter or the cache through
/// their best-effort operations; they are converted to permissive results at
/// that boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No store connection parameters were provided.
    #[error("key store is not configured")]
    Unconfigured,

    /// The store could not be reached.
    #[error("key store connection failed: {0}")]
    Connection(String),

    /// The store did not answer within the request timeout.
    #[error("key store request timed out after {0} ms")]
    Timeout(u64),

    /// The store rejected a command.
    #[error("key store command failed: {0}")]
    Command(String),

    /// The store answered with something the client cannot interpret.
    #[error("malformed key store response: {0}")]
    MalformedResponse(String),

    /// A cached payload could not be encoded or decoded.
    #[error("cache payload codec error: {0}")]
    Codec(String),
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Internal(value.to_string())
    }
}
