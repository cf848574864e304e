//! CLI, socket client, command implementations.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod socket;

pub use cli::{AuthAction, Cli, Command, ConfigAction, DriveAction, ServerAction, SheetsAction};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use socket::SocketClient;
