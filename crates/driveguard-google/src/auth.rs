//! Credential lifecycle management.
//!
//! The [`Authenticator`] decides, for one profile, how to turn whatever is
//! on disk into a usable access token: reuse the stored token, refresh it,
//! or run the browser consent flow. Every path that mints new tokens
//! persists them before the token is handed to the caller, so a crash right
//! after an API call never loses a grant.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};

use crate::error::{GoogleError, GoogleResult};
use crate::oauth::OAuthClient;
use crate::tokens::{TokenInfo, TokenStore};

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The interactions with the OAuth endpoints the lifecycle needs.
///
/// [`OAuthClient`] is the production implementation; tests substitute a
/// scripted broker to drive the lifecycle through its branches.
pub trait TokenBroker: Send + Sync {
    /// Runs the interactive consent flow for the given scopes.
    fn authorize(&self, scopes: &[String]) -> BoxFuture<'_, GoogleResult<TokenInfo>>;

    /// Exchanges a refresh token for a new access token and expiry.
    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, GoogleResult<(String, Option<i64>)>>;
}

impl TokenBroker for OAuthClient {
    fn authorize(&self, scopes: &[String]) -> BoxFuture<'_, GoogleResult<TokenInfo>> {
        let scopes = scopes.to_vec();
        Box::pin(async move { OAuthClient::authorize(self, &scopes).await })
    }

    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, GoogleResult<(String, Option<i64>)>> {
        let refresh_token = refresh_token.to_string();
        Box::pin(async move { OAuthClient::refresh_token(self, &refresh_token).await })
    }
}

/// Drives the credential lifecycle for one profile.
pub struct Authenticator<B> {
    broker: B,
    store: TokenStore,
    scopes: Vec<String>,
}

impl<B: TokenBroker> Authenticator<B> {
    /// Creates an authenticator over the given broker and token store.
    pub fn new(broker: B, store: TokenStore, scopes: Vec<String>) -> Self {
        Self {
            broker,
            store,
            scopes,
        }
    }

    /// Returns a valid token record, refreshing or re-consenting as needed.
    ///
    /// The decision order:
    ///
    /// 1. No stored record, or the granted scopes do not cover the required
    ///    ones: run the consent flow. A scope shortfall forces consent even
    ///    when the token is otherwise valid, since refresh cannot widen a
    ///    grant.
    /// 2. Stored record is valid: return it without touching disk.
    /// 3. Expired with a refresh token: refresh. If the refresh is rejected,
    ///    fall back to consent rather than failing.
    /// 4. Expired without a refresh token: consent.
    ///
    /// A consent failure is terminal; there is nothing left to fall back to.
    pub async fn obtain(&self) -> GoogleResult<TokenInfo> {
        let stored = self.store.read();

        let tokens = match stored {
            None => {
                info!("no token record, starting consent flow");
                return self.consent().await;
            }
            Some(tokens) => tokens,
        };

        if !tokens.covers_scopes(&self.scopes) {
            info!("stored grant does not cover required scopes, re-consenting");
            return self.consent().await;
        }

        if !tokens.is_expired() {
            debug!("stored token is valid");
            return Ok(tokens);
        }

        match tokens.refresh_token.clone() {
            Some(refresh_token) => {
                debug!("access token expired, refreshing");
                match self.broker.refresh(&refresh_token).await {
                    Ok((access_token, expires_in)) => {
                        let mut updated = tokens;
                        updated.update_access_token(access_token, expires_in);
                        self.store.write(&updated)?;
                        Ok(updated)
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh rejected, falling back to consent");
                        self.consent().await
                    }
                }
            }
            None => {
                info!("expired token with no refresh token, re-consenting");
                self.consent().await
            }
        }
    }

    /// Runs the consent flow and persists the resulting record.
    async fn consent(&self) -> GoogleResult<TokenInfo> {
        let tokens = self
            .broker
            .authorize(&self.scopes)
            .await
            .map_err(|e| GoogleError::auth(format!("consent flow failed: {}", e)))?;
        self.store.write(&tokens)?;
        Ok(tokens)
    }

    /// Removes the persisted token record for this profile.
    pub fn logout(&self) -> GoogleResult<()> {
        self.store.clear()
    }

    /// Returns the stored token record without driving the lifecycle.
    pub fn peek(&self) -> Option<TokenInfo> {
        self.store.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GoogleErrorCode;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Scripted broker recording how often each flow ran.
    struct FakeBroker {
        authorize_result: Mutex<Option<GoogleResult<TokenInfo>>>,
        refresh_result: Mutex<Option<GoogleResult<(String, Option<i64>)>>>,
        authorize_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    impl FakeBroker {
        fn new() -> Self {
            Self {
                authorize_result: Mutex::new(None),
                refresh_result: Mutex::new(None),
                authorize_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
            }
        }

        fn with_authorize(self, result: GoogleResult<TokenInfo>) -> Self {
            *self.authorize_result.lock().unwrap() = Some(result);
            self
        }

        fn with_refresh(self, result: GoogleResult<(String, Option<i64>)>) -> Self {
            *self.refresh_result.lock().unwrap() = Some(result);
            self
        }
    }

    impl TokenBroker for FakeBroker {
        fn authorize(&self, _scopes: &[String]) -> BoxFuture<'_, GoogleResult<TokenInfo>> {
            self.authorize_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .authorize_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(GoogleError::internal("no scripted authorize result")));
            Box::pin(async move { result })
        }

        fn refresh(
            &self,
            _refresh_token: &str,
        ) -> BoxFuture<'_, GoogleResult<(String, Option<i64>)>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .refresh_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(GoogleError::internal("no scripted refresh result")));
            Box::pin(async move { result })
        }
    }

    fn scopes() -> Vec<String> {
        vec!["scope-a".to_string()]
    }

    fn fresh_token() -> TokenInfo {
        TokenInfo::new("fresh-access", Some("refresh-1".to_string()), Some(3600), scopes())
    }

    fn expired_token(with_refresh: bool) -> TokenInfo {
        let mut tokens = TokenInfo::new(
            "stale-access",
            with_refresh.then(|| "refresh-1".to_string()),
            Some(3600),
            scopes(),
        );
        tokens.expires_at = Some(Utc::now() - Duration::hours(1));
        tokens
    }

    fn setup(dir: &TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("token.json"))
    }

    #[tokio::test]
    async fn no_record_runs_consent_and_persists() {
        let dir = TempDir::new().unwrap();
        let broker = FakeBroker::new().with_authorize(Ok(fresh_token()));
        let auth = Authenticator::new(broker, setup(&dir), scopes());

        let tokens = auth.obtain().await.unwrap();
        assert_eq!(tokens.access_token, "fresh-access");
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 1);

        // Persisted before return
        let on_disk = setup(&dir).read().unwrap();
        assert_eq!(on_disk.access_token, "fresh-access");
    }

    #[tokio::test]
    async fn valid_record_returned_without_writes() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&fresh_token()).unwrap();
        let written = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        let auth = Authenticator::new(FakeBroker::new(), store, scopes());
        let tokens = auth.obtain().await.unwrap();

        assert_eq!(tokens.access_token, "fresh-access");
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.broker.refresh_calls.load(Ordering::SeqCst), 0);

        let after = std::fs::metadata(auth.store.path())
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(written, after);
    }

    #[tokio::test]
    async fn scope_shortfall_forces_consent_even_when_valid() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&fresh_token()).unwrap();

        let mut granted = fresh_token();
        granted.scopes = vec!["scope-a".to_string(), "scope-b".to_string()];
        granted.access_token = "widened-access".to_string();

        let broker = FakeBroker::new().with_authorize(Ok(granted));
        let required = vec!["scope-a".to_string(), "scope-b".to_string()];
        let auth = Authenticator::new(broker, store, required);

        let tokens = auth.obtain().await.unwrap();
        assert_eq!(tokens.access_token, "widened-access");
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 1);
        // Refresh cannot widen a grant, so it is never attempted
        assert_eq!(auth.broker.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_record_refreshes_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&expired_token(true)).unwrap();

        let broker = FakeBroker::new().with_refresh(Ok(("new-access".to_string(), Some(3600))));
        let auth = Authenticator::new(broker, store, scopes());

        let tokens = auth.obtain().await.unwrap();
        assert_eq!(tokens.access_token, "new-access");
        assert!(!tokens.is_expired());
        assert_eq!(auth.broker.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 0);

        // Refresh token survives the update
        let on_disk = setup(&dir).read().unwrap();
        assert_eq!(on_disk.access_token, "new-access");
        assert_eq!(on_disk.refresh_token, Some("refresh-1".to_string()));
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_consent() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&expired_token(true)).unwrap();

        let broker = FakeBroker::new()
            .with_refresh(Err(GoogleError::auth("invalid_grant")))
            .with_authorize(Ok(fresh_token()));
        let auth = Authenticator::new(broker, store, scopes());

        let tokens = auth.obtain().await.unwrap();
        assert_eq!(tokens.access_token, "fresh-access");
        assert_eq!(auth.broker.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_without_refresh_token_consents() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&expired_token(false)).unwrap();

        let broker = FakeBroker::new().with_authorize(Ok(fresh_token()));
        let auth = Authenticator::new(broker, store, scopes());

        auth.obtain().await.unwrap();
        assert_eq!(auth.broker.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn consent_failure_is_terminal() {
        let dir = TempDir::new().unwrap();
        let broker = FakeBroker::new().with_authorize(Err(GoogleError::auth("user denied")));
        let auth = Authenticator::new(broker, setup(&dir), scopes());

        let err = auth.obtain().await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::AuthFailed);
        assert!(err.message().contains("consent flow failed"));

        // Nothing was persisted
        assert!(auth.peek().is_none());
    }

    #[tokio::test]
    async fn malformed_record_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(store.path(), "{ truncated").unwrap();

        let broker = FakeBroker::new().with_authorize(Ok(fresh_token()));
        let auth = Authenticator::new(broker, store, scopes());

        let tokens = auth.obtain().await.unwrap();
        assert_eq!(tokens.access_token, "fresh-access");
        assert_eq!(auth.broker.authorize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_clears_record() {
        let dir = TempDir::new().unwrap();
        let store = setup(&dir);
        store.write(&fresh_token()).unwrap();

        let auth = Authenticator::new(FakeBroker::new(), store, scopes());
        assert!(auth.peek().is_some());
        auth.logout().unwrap();
        assert!(auth.peek().is_none());
    }
}
