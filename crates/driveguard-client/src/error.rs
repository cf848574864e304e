//! Client error types.

use std::fmt;

use driveguard_protocol::ErrorResponse;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// A Google API or credential lifecycle failure.
    Api(driveguard_google::GoogleError),
    /// IO error.
    Io(std::io::Error),
    /// Connection to the daemon failed.
    Connection(String),
    /// Protocol/framing error.
    Protocol(String),
    /// Request timed out.
    Timeout(String),
    /// The daemon returned a structured error.
    Server(ErrorResponse),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Api(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::Server(err) => write!(f, "server error [{:?}]: {}", err.code, err.message),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<driveguard_google::GoogleError> for ClientError {
    fn from(err: driveguard_google::GoogleError) -> Self {
        Self::Api(err)
    }
}

impl From<driveguard_core::CoreError> for ClientError {
    fn from(err: driveguard_core::CoreError) -> Self {
        Self::Api(err.into())
    }
}
