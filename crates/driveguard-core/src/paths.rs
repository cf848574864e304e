//! Install paths.
//!
//! All state lives under one config directory: `$XDG_CONFIG_HOME/driveguard`
//! (falling back to `~/.config/driveguard`). Each profile owns a directory
//! under `profiles/` holding its OAuth client credentials and token record.
//! Constructed once and passed explicitly; nothing here touches the
//! filesystem.

use std::path::{Path, PathBuf};

/// Directory name under the user config dir.
pub const APP_DIR_NAME: &str = "driveguard";

/// Well-known locations derived from the install base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    /// Resolves the default base directory from the environment.
    pub fn from_env() -> Self {
        let config_root = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            base: config_root.join(APP_DIR_NAME),
        }
    }

    /// Uses an explicit base directory (tests, `--config-dir`).
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The install base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of the resource registry document.
    pub fn registry_path(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Path of the client settings file.
    pub fn client_config_path(&self) -> PathBuf {
        self.base.join("client.toml")
    }

    /// Directory owned exclusively by one profile.
    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.base.join("profiles").join(profile)
    }

    /// The profile's durable token record.
    pub fn token_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join("token.json")
    }

    /// The profile's OAuth client credentials (Google Cloud Console JSON).
    pub fn credentials_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join("credentials.json")
    }
}
