//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for the daemon's socket listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the Unix socket to bind.
    pub socket_path: PathBuf,

    /// Deadline applied to each read and write on a client connection.
    pub connection_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration listening on the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the per-operation connection deadline.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(default_socket_path())
    }
}

/// Socket path for the current user.
///
/// `$XDG_RUNTIME_DIR/driveguard.sock` when the runtime dir is set, otherwise
/// `/tmp/driveguard-<uid>.sock`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("driveguard.sock")
    } else {
        #[cfg(unix)]
        let uid = unsafe { libc::getuid() };
        #[cfg(not(unix))]
        let uid = 0;
        PathBuf::from(format!("/tmp/driveguard-{}.sock", uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_user_socket() {
        let config = ServerConfig::default();
        assert!(config.socket_path.to_string_lossy().contains("driveguard"));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_override() {
        let config = ServerConfig::new("/run/user/1000/dg.sock")
            .with_connection_timeout(Duration::from_secs(5));
        assert_eq!(config.socket_path, PathBuf::from("/run/user/1000/dg.sock"));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_socket_path_is_user_scoped() {
        let path = default_socket_path();
        let path = path.to_string_lossy();
        assert!(path.contains("driveguard"));
        assert!(path.ends_with(".sock"));
    }
}
