//! Google API configuration and OAuth client credentials.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use driveguard_core::AppPaths;

use crate::error::{GoogleError, GoogleResult};

/// OAuth scope for full Sheets access.
pub const SCOPE_SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";

/// OAuth scope for Drive files created or opened by this application.
pub const SCOPE_DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";

/// OAuth scope for read-only Drive access.
pub const SCOPE_DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Environment variable overriding the credentials file location.
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDENTIALS";

/// The scopes requested when none are configured explicitly.
pub fn default_scopes() -> Vec<String> {
    vec![SCOPE_SPREADSHEETS.to_string(), SCOPE_DRIVE_FILE.to_string()]
}

/// OAuth 2.0 client credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GoogleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoogleError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            GoogleError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        // Try nested format first (installed or web section)
        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        // Flat format (client_id and client_secret at root level)
        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(GoogleError::configuration(
            "credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for Google API access scoped to one profile.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Profile name. Each profile has its own credentials and token record.
    pub profile: String,

    /// OAuth client credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path to the persisted token record for this profile.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for a profile with the given credentials.
    pub fn new(profile: impl Into<String>, credentials: OAuthCredentials, paths: &AppPaths) -> Self {
        let profile = profile.into();
        let token_path = paths.token_path(&profile);
        Self {
            profile,
            credentials,
            token_path,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("driveguard/{}", env!("CARGO_PKG_VERSION")),
            scopes: default_scopes(),
        }
    }

    /// Loads the configuration for a profile.
    ///
    /// The client credentials come from `profiles/<profile>/credentials.json`
    /// under the config directory, or from the file named by the
    /// `GOOGLE_CREDENTIALS` environment variable when set.
    pub fn for_profile(profile: impl Into<String>, paths: &AppPaths) -> GoogleResult<Self> {
        let profile = profile.into();

        let credentials_path = match std::env::var(CREDENTIALS_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => paths.credentials_path(&profile),
        };

        let credentials = OAuthCredentials::from_file(&credentials_path)?;
        Ok(Self::new(profile, credentials, paths))
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GoogleResult<()> {
        self.credentials
            .validate()
            .map_err(|e| GoogleError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(GoogleError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        Ok(())
    }
}
