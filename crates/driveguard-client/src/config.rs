//! Client configuration.
//!
//! Settings live in `client.toml` inside the install config directory,
//! next to the registry (`config.json`). The file is optional; every
//! field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use driveguard_core::AppPaths;

/// Configuration for the driveguard client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Path to the daemon socket.
    pub socket_path: Option<PathBuf>,

    /// Daemon connection timeout in seconds.
    pub timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_profile: None,
            socket_path: None,
            timeout: 30,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the install directory.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(paths: &AppPaths) -> Result<Self, String> {
        Self::load_from(&paths.client_config_path())
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Resolves the effective profile: CLI flag, then config, then `default`.
    pub fn profile(&self, cli_profile: Option<&str>) -> String {
        cli_profile
            .map(str::to_string)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    /// Resolves the effective socket path: CLI flag, then config, then the
    /// daemon default.
    pub fn socket_path(&self, cli_socket: Option<&Path>) -> PathBuf {
        cli_socket
            .map(Path::to_path_buf)
            .or_else(|| self.socket_path.clone())
            .unwrap_or_else(driveguard_server::default_socket_path)
    }

    /// The daemon connection timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("client.toml")).unwrap();
        assert_eq!(config.timeout, 30);
        assert!(config.default_profile.is_none());
    }

    #[test]
    fn malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "timeout = \"not a number\"").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());
    }

    #[test]
    fn parses_all_fields() {
        let config: ClientConfig = toml::from_str(
            r#"
            default_profile = "work"
            socket_path = "/run/user/1000/driveguard.sock"
            timeout = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("work"));
        assert_eq!(config.timeout, 10);
    }

    #[test]
    fn profile_resolution_order() {
        let config = ClientConfig {
            default_profile: Some("work".to_string()),
            ..Default::default()
        };
        assert_eq!(config.profile(Some("cli")), "cli");
        assert_eq!(config.profile(None), "work");
        assert_eq!(ClientConfig::default().profile(None), "default");
    }

    #[test]
    fn socket_path_resolution_order() {
        let config = ClientConfig {
            socket_path: Some(PathBuf::from("/tmp/from-config.sock")),
            ..Default::default()
        };
        assert_eq!(
            config.socket_path(Some(Path::new("/tmp/from-cli.sock"))),
            PathBuf::from("/tmp/from-cli.sock")
        );
        assert_eq!(
            config.socket_path(None),
            PathBuf::from("/tmp/from-config.sock")
        );
    }
}
