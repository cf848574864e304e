//! Persisted OAuth token records.
//!
//! Each profile owns one token record on disk. Reads are tolerant: a missing
//! or unreadable record is treated the same as never having authenticated,
//! and the consent flow produces a fresh one. Writes go through a temp file
//! and rename so a crash never leaves a partial record behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GoogleError, GoogleResult};

/// Seconds subtracted from the reported expiry so tokens refresh early.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// One profile's OAuth token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a new token record from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS)
        });

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // No expiry recorded means the token is assumed valid
            None => false,
        }
    }

    /// Returns true if the granted scopes cover every required scope.
    ///
    /// A superset grant is fine; only a shortfall forces re-consent.
    pub fn covers_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Updates the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| {
            Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS)
        });
        self.last_refresh = Utc::now();
    }

    /// Returns the time until the token expires, if known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - Utc::now())
    }
}

/// File-backed token storage for one profile.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a token store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the token record from disk.
    ///
    /// Returns `None` when no record exists or the record cannot be parsed.
    /// A corrupt record is logged and treated as absent rather than failing
    /// the caller; the lifecycle falls back to consent.
    pub fn read(&self) -> Option<TokenInfo> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token record");
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read token record");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed token record, ignoring");
                None
            }
        }
    }

    /// Writes the token record to disk atomically.
    ///
    /// The record is written to a temp file and renamed into place, then
    /// given owner-only permissions.
    pub fn write(&self, tokens: &TokenInfo) -> GoogleResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GoogleError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| GoogleError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            GoogleError::configuration(format!("failed to write token record: {}", e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            GoogleError::configuration(format!("failed to rename token record: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!(path = %self.path.display(), "persisted token record");
        Ok(())
    }

    /// Removes the token record from disk, if present.
    pub fn clear(&self) -> GoogleResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                GoogleError::configuration(format!("failed to remove token record: {}", e))
            })?;
            info!(path = %self.path.display(), "cleared token record");
        }
        Ok(())
    }

    /// Returns the token record path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("token.json"))
    }

    #[test]
    fn token_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        );

        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token, Some("refresh-token".to_string()));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn token_expiry() {
        let mut token = TokenInfo::new("access", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        // Short-lived tokens count as expired within the buffer window
        let soon = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(soon.is_expired());
    }

    #[test]
    fn scope_superset_is_sufficient() {
        let token = TokenInfo::new(
            "access",
            None,
            None,
            vec!["scope1".to_string(), "scope2".to_string()],
        );

        assert!(token.covers_scopes(&["scope1".to_string()]));
        assert!(token.covers_scopes(&["scope1".to_string(), "scope2".to_string()]));
        assert!(!token.covers_scopes(&["scope3".to_string()]));
    }

    #[test]
    fn store_write_and_read() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        );

        store.write(&token).unwrap();
        assert!(store.path().exists());

        let loaded = store.read().unwrap();
        assert_eq!(loaded.access_token, "access-token");
        assert_eq!(loaded.scopes, vec!["scope1".to_string()]);
    }

    #[test]
    fn store_missing_file_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.read().is_none());
    }

    #[test]
    fn store_malformed_record_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json at all").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn store_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("token.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn store_write_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn store_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.read().is_none());
    }
}
