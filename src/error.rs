//! Error types for the console chat core.
//!
//! Timeout and mid-stream failures are not here on purpose: the session
//! surfaces those as abort causes and turn outcomes, never as errors.

/// Top-level error type for the streaming chat console.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Rejected locally before any I/O (empty message, no model, busy session).
    #[error("validation error: {0}")]
    Validation(String),

    /// HTTP request to the admin backend failed (transport or non-2xx).
    #[error("request error: {0}")]
    Request(String),

    /// Conversation persistence error reported by the backend.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration fetch or parse error.
    #[error("config error: {0}")]
    Config(String),

    /// Speech capture or playback error.
    #[error("speech error: {0}")]
    Speech(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ConsoleError>;
