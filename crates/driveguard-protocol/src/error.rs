//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Failures at the framing and encoding layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A frame exceeds the negotiated size cap.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    /// A payload failed to encode or decode as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stream failed mid-frame.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame with a zero-length payload arrived.
    #[error("empty message")]
    EmptyMessage,

    /// A read or write missed its deadline.
    #[error("timeout during {operation}")]
    Timeout { operation: String },
}
