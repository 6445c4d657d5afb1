//! Error types for the engine.

use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No decision with this id is owned by the requesting user.
    ///
    /// Deliberately identical for "does not exist" and "belongs to someone
    /// else" so existence is not leaked across users.
    #[error("Decision not found: {0}")]
    DecisionNotFound(i64),

    /// The decision has already been reviewed; review is a one-time
    /// transition.
    #[error("Decision already reviewed: {0}")]
    AlreadyReviewed(i64),

    /// Invalid input (e.g. a rejection without a correction payload).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal invariant failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
