//! Daemon error types.

use std::io;
use thiserror::Error;

/// Result type for daemon operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Failures in the daemon's socket and lifecycle plumbing.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] driveguard_protocol::ProtocolError),

    /// A live daemon already answers on the socket path.
    #[error("socket {path} is in use by a running daemon")]
    SocketBusy { path: String },

    /// A live daemon already holds the PID file.
    #[error("daemon already running (pid file {path})")]
    AlreadyRunning { path: String },

    /// Startup configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// A shutdown request ended the connection loop.
    #[error("shutdown requested")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a busy-socket error.
    pub fn socket_busy(path: impl Into<String>) -> Self {
        Self::SocketBusy { path: path.into() }
    }

    /// Creates an already-running error.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }
}
