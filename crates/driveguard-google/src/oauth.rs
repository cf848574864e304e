//! OAuth 2.0 PKCE flow for Google APIs.
//!
//! The consent flow binds a short-lived loopback HTTP server, sends the user
//! to Google's consent page, captures the redirect carrying the authorization
//! code, and exchanges the code (with the PKCE verifier) for tokens. The
//! state parameter guards the redirect against CSRF.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::OAuthCredentials;
use crate::error::{GoogleError, GoogleResult};
use crate::tokens::TokenInfo;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the user to finish the consent page.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Poll interval of the redirect server's accept loop.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// OAuth client for Google APIs.
///
/// Handles the OAuth 2.0 PKCE flow for obtaining and refreshing tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given client credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the consent flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback server cannot be started, the user
    /// denies authorization, the redirect times out, or the token exchange
    /// fails.
    pub async fn authorize(&self, scopes: &[String]) -> GoogleResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let callback = CallbackServer::start()?;
        let redirect_uri = callback.redirect_uri();

        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth consent flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) = callback.wait(CALLBACK_TIMEOUT)?;

        if received_state != pkce.state {
            return Err(GoogleError::auth(
                "OAuth state mismatch, possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Refreshes an expired access token using the refresh token.
    ///
    /// Returns the new access token and its expiry time.
    pub async fn refresh_token(&self, refresh_token: &str) -> GoogleResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GoogleError::auth(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GoogleError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> GoogleResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::network(format!("token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GoogleError::auth(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GoogleError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            scopes.to_vec(),
        ))
    }
}

/// Loopback server that captures the OAuth redirect.
///
/// The accept loop polls a stop flag, so when the wait deadline passes the
/// thread exits and the listener port is released rather than staying bound
/// until process exit.
struct CallbackServer {
    port: u16,
    stop: Arc<AtomicBool>,
    results: mpsc::Receiver<GoogleResult<(String, String)>>,
}

impl CallbackServer {
    /// Binds 127.0.0.1 on an OS-assigned port and starts the accept thread.
    fn start() -> GoogleResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").map_err(|e| {
            GoogleError::configuration(format!("failed to bind loopback server: {}", e))
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| GoogleError::internal(format!("failed to read local address: {}", e)))?
            .port();
        listener
            .set_nonblocking(true)
            .map_err(|e| GoogleError::internal(format!("failed to set nonblocking: {}", e)))?;
        debug!("bound loopback server on port {}", port);

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, results) = mpsc::channel();

        let accept_stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !accept_stop.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        // Accepted sockets may inherit the nonblocking flag
                        // on some platforms; force blocking reads.
                        let _ = stream.set_nonblocking(false);
                        if let Some(result) = handle_redirect(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                    Err(e) => {
                        warn!("failed to accept redirect connection: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            port,
            stop,
            results,
        })
    }

    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Waits up to `deadline` for the redirect, then stops the accept thread.
    fn wait(self, deadline: Duration) -> GoogleResult<(String, String)> {
        let received = self.results.recv_timeout(deadline);
        self.stop.store(true, Ordering::Relaxed);

        match received {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(GoogleError::auth(
                "timed out waiting for the OAuth redirect",
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(GoogleError::internal("redirect channel disconnected"))
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Handles one HTTP request on the redirect server.
///
/// Returns `None` for requests that are not the expected redirect, so
/// favicon fetches and the like do not end the flow.
fn handle_redirect(mut stream: TcpStream) -> Option<GoogleResult<(String, String)>> {
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();

    if reader.read_line(&mut request_line).is_err() {
        return None;
    }

    // GET /callback?code=...&state=... HTTP/1.1
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let path = parts.next()?;
    if !path.starts_with("/callback") {
        return None;
    }

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut denial = None;
    for (key, value) in query_params(query) {
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => denial = Some(value),
            _ => {}
        }
    }

    let page = if denial.is_some() || code.is_none() {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    } else {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();

    if let Some(denial) = denial {
        return Some(Err(GoogleError::auth(format!(
            "authorization denied: {}",
            denial
        ))));
    }

    match code {
        Some(code) => Some(Ok((code, state.unwrap_or_default()))),
        None => Some(Err(GoogleError::auth(
            "missing authorization code in redirect",
        ))),
    }
}

/// Splits a query string into percent-decoded key/value pairs.
fn query_params(query: &str) -> impl Iterator<Item = (&str, String)> {
    query.split('&').filter_map(|param| {
        let (key, value) = param.split_once('=')?;
        let value = urlencoding::decode(value).unwrap_or_default().into_owned();
        Some((key, value))
    })
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Generates a cryptographically random code verifier.
    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Generates a random state string for CSRF protection.
    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the Google OAuth authorization URL.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
