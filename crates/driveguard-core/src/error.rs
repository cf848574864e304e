//! Core error taxonomy.
//!
//! Three cases matter to callers: an alias that is not in the registry
//! (`NotFound`), an operation the access guard refused (`AccessDenied`), and
//! configuration problems. Everything transport-related lives in the other
//! crates' error types.

use thiserror::Error;

use crate::registry::ResourceKind;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the registry and the access guard.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An alias was not present in the relevant registry collection.
    ///
    /// An unresolved alias never falls back to being treated as a raw
    /// resource identifier.
    #[error("{kind} alias '{alias}' is not configured")]
    NotFound {
        /// Which registry collection was consulted.
        kind: ResourceKind,
        /// The alias that failed to resolve.
        alias: String,
    },

    /// The access guard refused an operation.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Why the operation was refused.
        reason: String,
    },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Creates a not-found error for the given registry kind and alias.
    pub fn not_found(kind: ResourceKind, alias: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            alias: alias.into(),
        }
    }

    /// Creates an access-denied error with the given reason.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
