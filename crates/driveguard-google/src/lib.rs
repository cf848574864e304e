//! Google Drive and Sheets access for driveguard.
//!
//! This crate owns the full credential lifecycle (consent, refresh,
//! persistence) and the guarded Drive/Sheets operations built on top of it.
//! The layering, bottom up:
//!
//! - [`oauth`]: the OAuth 2.0 PKCE consent flow and token refresh
//! - [`tokens`]: per-profile persisted token records
//! - [`auth`]: the lifecycle manager deciding between reuse, refresh, and
//!   consent
//! - [`client`]: the raw Drive v3 / Sheets v4 HTTP client
//! - [`drive`] / [`sheets`]: operations behind the access guard
//! - [`context`]: profile-scoped wiring of all of the above

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod drive;
pub mod error;
pub mod oauth;
pub mod sheets;
pub mod tokens;

pub use auth::{Authenticator, BoxFuture, TokenBroker};
pub use client::{ApiClient, DriveFile};
pub use config::{GoogleConfig, OAuthCredentials, default_scopes};
pub use context::{GoogleContext, authenticator};
pub use drive::DriveService;
pub use error::{GoogleError, GoogleErrorCode, GoogleResult};
pub use oauth::OAuthClient;
pub use sheets::SheetsService;
pub use tokens::{TokenInfo, TokenStore};
