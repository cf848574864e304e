//! Credential lifecycle commands.

use std::path::Path;

use tracing::info;

use driveguard_core::AppPaths;
use driveguard_google::{OAuthCredentials, authenticator};

use crate::error::{ClientError, ClientResult};

/// Runs the OAuth consent flow for a profile.
///
/// With `--credentials-file`, the Google Cloud Console JSON is first
/// imported into the profile directory so later runs (and the daemon)
/// find it there.
pub async fn login(
    paths: &AppPaths,
    profile: &str,
    force: bool,
    credentials_file: Option<&Path>,
) -> ClientResult<()> {
    if let Some(source) = credentials_file {
        import_credentials(paths, profile, source)?;
    }

    let auth = authenticator(paths, profile)?;

    if force {
        auth.logout()?;
    } else if let Some(tokens) = auth.peek()
        && !tokens.is_expired()
    {
        println!("Profile '{}' is already authenticated.", profile);
        println!("Use --force to re-run the consent flow.");
        return Ok(());
    }

    println!("Starting Google authentication for profile '{}'...", profile);
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    let tokens = auth.obtain().await?;

    info!(profile = %profile, "authentication successful");
    println!("Authentication successful!");
    if let Some(expiry) = tokens.expires_at {
        println!("Access token valid until {}.", expiry.to_rfc3339());
    }
    println!("Tokens saved to {}.", paths.token_path(profile).display());

    Ok(())
}

/// Copies an OAuth client credentials file into the profile directory.
fn import_credentials(paths: &AppPaths, profile: &str, source: &Path) -> ClientResult<()> {
    // Validate before copying so a wrong file fails with a clear message
    let credentials = OAuthCredentials::from_file(source)?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid credentials file: {}", e)))?;

    let destination = paths.credentials_path(profile);
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, &destination)?;

    println!("Imported credentials to {}.", destination.display());
    Ok(())
}

/// Shows the stored token record for a profile.
pub fn status(paths: &AppPaths, profile: &str) -> ClientResult<()> {
    let auth = authenticator(paths, profile)?;

    println!("Profile:    {}", profile);
    println!("Token file: {}", paths.token_path(profile).display());

    match auth.peek() {
        Some(tokens) => {
            let state = if tokens.is_expired() {
                "expired"
            } else {
                "valid"
            };
            println!("State:      {}", state);
            if let Some(expiry) = tokens.expires_at {
                println!("Expires:    {}", expiry.to_rfc3339());
            }
            println!(
                "Refresh:    {}",
                if tokens.refresh_token.is_some() {
                    "available"
                } else {
                    "absent (consent required on expiry)"
                }
            );
            println!("Scopes:     {}", tokens.scopes.join(" "));
        }
        None => {
            println!("State:      not authenticated");
            println!("Run `driveguard auth login --profile {}` to sign in.", profile);
        }
    }

    Ok(())
}

/// Deletes the stored token record for a profile.
pub fn logout(paths: &AppPaths, profile: &str) -> ClientResult<()> {
    let auth = authenticator(paths, profile)?;

    if auth.peek().is_none() {
        println!("Profile '{}' has no stored tokens.", profile);
        return Ok(());
    }

    auth.logout()?;
    info!(profile = %profile, "token record deleted");
    println!("Logged out profile '{}'.", profile);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_credentials(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("creds.json");
        std::fs::write(
            &path,
            r#"{
                "installed": {
                    "client_id": "test.apps.googleusercontent.com",
                    "client_secret": "test-secret",
                    "redirect_uris": ["http://localhost"]
                }
            }"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn import_copies_into_profile_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path().join("config"));
        let source = write_credentials(dir.path());

        import_credentials(&paths, "work", &source).unwrap();

        let imported = paths.credentials_path("work");
        assert!(imported.exists());
        let reloaded = OAuthCredentials::from_file(&imported).unwrap();
        assert_eq!(reloaded.client_id, "test.apps.googleusercontent.com");
    }

    #[test]
    fn import_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path().join("config"));
        let source = dir.path().join("bad.json");
        std::fs::write(&source, "{ not json").unwrap();

        assert!(import_credentials(&paths, "work", &source).is_err());
        assert!(!paths.credentials_path("work").exists());
    }

    #[test]
    fn status_without_credentials_errors() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());
        // No credentials.json for the profile
        assert!(status(&paths, "missing").is_err());
    }

    #[test]
    fn logout_with_no_tokens_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());
        let source = write_credentials(dir.path());
        import_credentials(&paths, "default", &source).unwrap();

        logout(&paths, "default").unwrap();
    }
}
