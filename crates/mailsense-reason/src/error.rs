//! Error types for completion-service calls.

/// Result type alias for completion-service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Completion-service error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the completion service.
    #[error("completion service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the service.
        message: String,
    },

    /// The reply parsed but carried no text content.
    #[error("completion reply carried no text content")]
    EmptyCompletion,
}
