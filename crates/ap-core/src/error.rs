//! Error types for the session client

use thiserror::Error;

/// Result type for session client operations
pub type Result<T> = std::result::Result<T, ApError>;

/// Session client error types
#[derive(Debug, Error)]
pub enum ApError {
    /// No live session exists
    #[error("Not connected")]
    NotConnected,

    /// Handshake did not complete
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Server rejected the connection (slot, password, game or version)
    #[error("Connection refused: {}", .0.join(", "))]
    ConnectionRefused(Vec<String>),

    /// Recoverable network failure
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// A deferred task failed while running on the main thread
    #[error("Task failed: {0}")]
    TaskExecution(String),

    /// Malformed input, detected without a network round-trip
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for ApError {
    fn from(err: serde_json::Error) -> Self {
        ApError::Serialization(err.to_string())
    }
}
