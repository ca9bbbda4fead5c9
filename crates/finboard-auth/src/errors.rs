//! Session error types.

/// Errors from persisting or loading the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// File I/O error.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("session JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
