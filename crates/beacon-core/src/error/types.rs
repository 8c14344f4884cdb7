//! Core error types and traits

use thiserror::Error;

/// Result type alias for data-access operations
pub type BeaconResult<T> = Result<T, BeaconError>;

/// Unified error trait implemented by every Beacon error.
///
/// - error_code(): unique code for programmatic error identification
/// - message(): message carried by the error
/// - context(): optional additional context
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the message carried by the error
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// Check if this error is worth retrying from the caller's side
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Main error type for the data-access layer
///
/// Only `Network`, `Api` and (after local recovery is exhausted)
/// `Unauthorized` are meant to reach the UI. `Aborted` is raised while the
/// context tears down and is suppressed by callers.
#[derive(Error, Debug, Clone)]
pub enum BeaconError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Transport failure: no response was received
    #[error("Network error: {message}")]
    Network { message: String, url: Option<String> },

    /// Authentication failed and could not be recovered by renewal
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-success response from the remote API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request was torn down together with its owning context
    #[error("Request aborted during teardown")]
    Aborted,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Persistent storage errors that escaped a storage boundary
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Anything else
    #[error("Error: {message}")]
    Internal { message: String },
}
