//! Single-instance guard backed by a PID file.
//!
//! The daemon records its PID on startup and removes the file when it exits
//! cleanly. On the next start a leftover file is checked against the live
//! process table before being reclaimed.

use std::path::{Path, PathBuf};
use std::{fs, process};

use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Held for the lifetime of the daemon; removes the file on drop.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes the current PID, refusing if another daemon holds the file.
    ///
    /// A file naming a dead process, or one that does not parse as a PID,
    /// is reclaimed.
    pub fn acquire(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();

        match stored_pid(&path) {
            Some(pid) if process_alive(pid) => {
                return Err(ServerError::already_running(path.to_string_lossy()));
            }
            Some(pid) => {
                warn!(path = %path.display(), pid, "reclaiming pid file of dead process");
            }
            None => {}
        }

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let pid = process::id();
        fs::write(&path, format!("{}\n", pid))?;
        info!(path = %path.display(), pid, "pid file acquired");

        Ok(Self { path })
    }

    /// Path of the held file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "pid file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove pid file"
            ),
        }
    }
}

/// Reads the PID recorded in `path`, if the file exists and parses.
fn stored_pid(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    match contents.trim().parse() {
        Ok(pid) => Some(pid),
        Err(_) => {
            warn!(path = %path.display(), "pid file does not contain a pid");
            None
        }
    }
}

/// Checks the process with signal 0.
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// PID file path for the current user.
///
/// `$XDG_RUNTIME_DIR/driveguard.pid` when the runtime dir is set, otherwise
/// `/tmp/driveguard-<uid>.pid`.
pub fn default_pid_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("driveguard.pid")
    } else {
        #[cfg(unix)]
        let uid = unsafe { libc::getuid() };
        #[cfg(not(unix))]
        let uid = 0;
        PathBuf::from(format!("/tmp/driveguard-{}.pid", uid))
    }
}
