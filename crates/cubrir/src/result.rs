//! Result and error types for Cubrir.

use thiserror::Error;

/// Result type for Cubrir operations
pub type CubrirResult<T> = Result<T, CubrirError>;

/// Errors that can occur in Cubrir
#[derive(Debug, Error)]
pub enum CubrirError {
    /// Source file could not be read during extraction
    #[error("Failed to read {path}: {message}")]
    FileRead {
        /// Path that failed
        path: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration at the reporter boundary
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Coverage threshold assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
