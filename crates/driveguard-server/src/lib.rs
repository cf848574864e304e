//! Daemon: Unix socket broker for Google Sheets and Drive access.
//!
//! This crate provides the driveguard server daemon that handles:
//! - Unix socket IPC for client communication
//! - Alias resolution against the resource registry
//! - Per-profile authenticated Google API sessions
//! - Folder allowlist enforcement for all Drive operations
//!
//! # Example
//!
//! ```rust,no_run
//! use driveguard_server::{ServerConfig, Signals, SocketServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = SocketServer::bind(ServerConfig::default()).await?;
//!     let signals = Signals::install();
//!     let shutdown = signals.shutdown_handle();
//!
//!     let handler = |_conn| async move { /* answer requests */ };
//!     server.serve(handler, async move { shutdown.triggered().await }).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod pidfile;
mod signals;
mod socket;

pub use config::{ServerConfig, default_socket_path};
pub use error::{ServerError, ServerResult};
pub use handler::{
    RequestHandler, ServerState, SharedState, make_connection_handler, new_shared_state,
};
pub use pidfile::{PidFile, default_pid_path};
pub use signals::{ReloadWatcher, ShutdownHandle, Signals};
pub use socket::{Connection, SocketServer};
