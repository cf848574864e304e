//! Error types for Google API operations.

use std::fmt;
use thiserror::Error;

use driveguard_core::CoreError;

/// The category of a Google API error.
///
/// This enum provides a high-level classification of errors for use in
/// protocol responses and retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoogleErrorCode {
    /// The credential lifecycle failed terminally.
    AuthFailed,
    /// Refused by the access guard or the remote authorization layer.
    AccessDenied,
    /// Resource not found (404, or unknown alias).
    NotFound,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    Network,
    /// Server returned an error (5xx status codes).
    Server,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Configuration error - missing or invalid config.
    Configuration,
    /// Internal error - unexpected state, bug.
    Internal,
}

impl GoogleErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::Server)
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailed => "auth_failed",
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Network => "network",
            Self::Server => "server",
            Self::InvalidResponse => "invalid_response",
            Self::BadRequest => "bad_request",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for GoogleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to Google APIs.
#[derive(Debug, Error)]
pub struct GoogleError {
    /// The error code categorizing this error.
    code: GoogleErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Server-suggested backoff, from a 429 `Retry-After` header.
    retry_after: Option<std::time::Duration>,
}

impl GoogleError {
    /// Creates a new error with the given code and message.
    pub fn new(code: GoogleErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            retry_after: None,
        }
    }

    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::AuthFailed, message)
    }

    /// Creates an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::AccessDenied, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::NotFound, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::RateLimited, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::Network, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::Server, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::InvalidResponse, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::Internal, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Records the server's suggested backoff.
    pub fn with_retry_after(mut self, delay: std::time::Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> GoogleErrorCode {
        self.code
    }

    /// Server-suggested backoff for a rate-limited request.
    ///
    /// This crate does not retry on its own; callers that do can honor it.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        self.retry_after
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<CoreError> for GoogleError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::NotFound { .. } => Self::not_found(err.to_string()),
            CoreError::AccessDenied { .. } => Self::access_denied(err.to_string()),
            CoreError::Config(_) => Self::configuration(err.to_string()),
        }
    }
}

/// A specialized Result type for Google API operations.
pub type GoogleResult<T> = Result<T, GoogleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use driveguard_core::registry::ResourceKind;

    #[test]
    fn error_code_retryable() {
        assert!(GoogleErrorCode::Network.is_retryable());
        assert!(GoogleErrorCode::RateLimited.is_retryable());
        assert!(GoogleErrorCode::Server.is_retryable());
        assert!(!GoogleErrorCode::AuthFailed.is_retryable());
        assert!(!GoogleErrorCode::AccessDenied.is_retryable());
    }

    #[test]
    fn error_code_display() {
        assert_eq!(GoogleErrorCode::AuthFailed.as_str(), "auth_failed");
        assert_eq!(GoogleErrorCode::RateLimited.as_str(), "rate_limited");
    }

    #[test]
    fn error_creation() {
        let err = GoogleError::auth("consent flow failed");
        assert_eq!(err.code(), GoogleErrorCode::AuthFailed);
        assert_eq!(err.message(), "consent flow failed");
        assert!(!err.is_retryable());
    }

    #[test]
    fn core_error_conversion() {
        let core = CoreError::not_found(ResourceKind::Sheet, "todo");
        let err: GoogleError = core.into();
        assert_eq!(err.code(), GoogleErrorCode::NotFound);
        assert!(err.message().contains("todo"));

        let core = CoreError::access_denied("folder F9 is not in the allowed folders");
        let err: GoogleError = core.into();
        assert_eq!(err.code(), GoogleErrorCode::AccessDenied);
    }

    #[test]
    fn retry_after_is_carried_when_set() {
        let err = GoogleError::rate_limited("rate limit exceeded");
        assert!(err.retry_after().is_none());

        let err = err.with_retry_after(std::time::Duration::from_secs(30));
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));
        assert!(err.is_retryable());
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = GoogleError::internal("failed to persist tokens").with_source(io_err);
        assert!(err.source().is_some());
    }
}
