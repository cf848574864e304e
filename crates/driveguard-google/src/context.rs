//! Wiring of config, credential lifecycle, and API client for one profile.

use driveguard_core::{AccessGuard, AppPaths};

use crate::auth::Authenticator;
use crate::client::ApiClient;
use crate::config::GoogleConfig;
use crate::drive::DriveService;
use crate::error::GoogleResult;
use crate::oauth::OAuthClient;
use crate::sheets::SheetsService;
use crate::tokens::TokenStore;

/// Builds the credential lifecycle manager for a profile without opening
/// an API session. Used for explicit login, status, and logout.
pub fn authenticator(
    paths: &AppPaths,
    profile: &str,
) -> GoogleResult<Authenticator<OAuthClient>> {
    let config = GoogleConfig::for_profile(profile, paths)?;
    config.validate()?;

    let broker = OAuthClient::new(config.credentials.clone(), config.timeout)?;
    let store = TokenStore::new(&config.token_path);
    Ok(Authenticator::new(broker, store, config.scopes))
}

/// An authenticated Google API session for one profile.
///
/// Opening a context drives the credential lifecycle to completion, which
/// may run the interactive consent flow in the user's browser.
pub struct GoogleContext {
    config: GoogleConfig,
    api: ApiClient,
}

impl GoogleContext {
    /// Opens an authenticated session for the given profile.
    pub async fn open(paths: &AppPaths, profile: &str) -> GoogleResult<Self> {
        let config = GoogleConfig::for_profile(profile, paths)?;
        Self::open_with_config(config).await
    }

    /// Opens an authenticated session with an explicit configuration.
    pub async fn open_with_config(config: GoogleConfig) -> GoogleResult<Self> {
        config.validate()?;

        let broker = OAuthClient::new(config.credentials.clone(), config.timeout)?;
        let store = TokenStore::new(&config.token_path);
        let auth = Authenticator::new(broker, store, config.scopes.clone());
        let tokens = auth.obtain().await?;

        let api = ApiClient::new(&tokens.access_token, config.timeout, &config.user_agent)?;
        Ok(Self { config, api })
    }

    /// Returns the profile this session belongs to.
    pub fn profile(&self) -> &str {
        &self.config.profile
    }

    /// Returns the underlying API client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Returns a Drive service guarded by the given folder allowlist.
    pub fn drive(&self, allowed_folder_ids: Vec<String>) -> DriveService<'_> {
        DriveService::new(&self.api, AccessGuard::new(allowed_folder_ids))
    }

    /// Returns a Sheets service for this session.
    pub fn sheets(&self) -> SheetsService<'_> {
        SheetsService::new(&self.api)
    }
}
