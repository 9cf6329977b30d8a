//! Common error types for Streetwise

use thiserror::Error;

/// Common result type for Streetwise operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the Streetwise services
///
/// Upstream fetch failures are deliberately absent: they are recovered
/// inside the aggregation pipeline and never reach this boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry store query failure (wraps sqlx::Error)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied input violates a precondition
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
