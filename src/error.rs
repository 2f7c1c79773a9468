//! Error types for coralkv
//!
//! Provides a unified error type for all client operations, plus the typed
//! remote error a device attaches to an individual response.

use thiserror::Error;

use crate::proto::StatusCode;

/// Result type alias using CoralError
pub type Result<T> = std::result::Result<T, CoralError>;

/// Unified error type for coralkv operations
#[derive(Debug, Error)]
pub enum CoralError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    /// The peer closed the connection cleanly at a frame boundary
    #[error("Connection closed by peer")]
    Closed,

    /// End of stream in the middle of a frame
    #[error("Invalid stream: truncated frame")]
    InvalidStream,

    /// The frame's first byte was not the magic sentinel; stream out of sync
    #[error("Invalid frame identifier: 0x{0:02x}")]
    InvalidIdentifier(u8),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    /// Send attempted on a session that is closed or never completed handshake
    #[error("Session not connected")]
    NotConnected,

    /// The transport write failed; the session is unusable
    #[error("Send failure: {0}")]
    SendFailure(#[source] std::io::Error),

    /// No response arrived within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The session closed while the request was in flight
    #[error("Session closed with request in flight")]
    ConnectionClosed,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A helper required a key that the device does not hold
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Remote Errors
    // -------------------------------------------------------------------------
    /// A non-success status returned by the device for one operation
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // -------------------------------------------------------------------------
    // Batch Errors
    // -------------------------------------------------------------------------
    /// Operation issued on a batch that already committed or aborted
    #[error("Batch is not active")]
    BatchNotActive,
}

/// Error status returned by the device for a single operation.
///
/// Remote errors are local to one operation's result; they never make the
/// session itself unusable.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct RemoteError {
    /// Device status code
    pub code: StatusCode,

    /// Human-readable status message (may be empty)
    pub message: String,

    /// Optional opaque detail bytes
    pub detail: Vec<u8>,
}

impl RemoteError {
    /// Build a remote error from a response status, or `None` on success.
    pub fn from_status(status: &crate::proto::Status) -> Option<RemoteError> {
        match status.code {
            StatusCode::Success => None,
            _ => Some(RemoteError::from(status)),
        }
    }
}

impl From<&crate::proto::Status> for RemoteError {
    fn from(status: &crate::proto::Status) -> Self {
        RemoteError {
            code: status.code,
            message: status.message.clone(),
            detail: status.detailed_message.clone(),
        }
    }
}
