//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use driveguard_core::AppPaths;

/// driveguard - guarded Google Sheets and Drive access
#[derive(Debug, Parser)]
#[command(name = "driveguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Profile whose credentials and resources to use
    #[arg(long, short, global = true, env = "DRIVEGUARD_PROFILE")]
    pub profile: Option<String>,

    /// Override the configuration directory
    #[arg(long, global = true, env = "DRIVEGUARD_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Path to the daemon socket
    #[arg(long, global = true, env = "DRIVEGUARD_SOCKET")]
    pub socket_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolves the install paths from `--config-dir` or the environment.
    pub fn paths(&self) -> AppPaths {
        match &self.config_dir {
            Some(dir) => AppPaths::with_base(dir),
            None => AppPaths::from_env(),
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Credential lifecycle commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Registry and configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Guarded Drive folder operations
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Sheets operations
    Sheets {
        #[command(subcommand)]
        action: SheetsAction,
    },

    /// Daemon management
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

/// Credential lifecycle actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Run the OAuth consent flow for the profile
    Login {
        /// Re-run consent even if a valid token record exists
        #[arg(long, short)]
        force: bool,

        /// Import OAuth client credentials (Google Cloud Console JSON)
        /// into the profile before authenticating
        #[arg(long)]
        credentials_file: Option<PathBuf>,
    },

    /// Show the stored token record for the profile
    Status,

    /// Delete the stored token record for the profile
    Logout,
}

/// Registry and configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// List registered sheet aliases
    ListSheets,

    /// List registered Drive folder aliases
    ListFolders,

    /// Show configuration file paths
    Path,

    /// Validate the registry and profile credentials
    Validate,
}

/// Guarded Drive folder actions.
#[derive(Debug, Subcommand)]
pub enum DriveAction {
    /// List files in a registered folder
    List {
        /// Folder alias from the registry
        folder: String,
    },

    /// List every file visible to the app (maintenance, bypasses the
    /// folder allowlist)
    ListAll,

    /// Upload a local file into a registered folder
    Upload {
        /// Folder alias from the registry
        folder: String,

        /// Local file to upload
        path: PathBuf,

        /// Remote filename (defaults to the local basename)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a file from a registered folder
    Download {
        /// Folder alias from the registry
        folder: String,

        /// Drive file ID
        file_id: String,

        /// Local destination path (defaults to the system temp directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Move a file to the Drive trash
    Delete {
        /// Folder alias from the registry
        folder: String,

        /// Drive file ID
        file_id: String,
    },
}

/// Sheets actions.
#[derive(Debug, Subcommand)]
pub enum SheetsAction {
    /// List the tabs of a registered spreadsheet
    Tabs {
        /// Sheet alias from the registry
        alias: String,
    },

    /// Read a cell range from a registered spreadsheet
    Values {
        /// Sheet alias from the registry
        alias: String,

        /// A1-notation range, e.g. `Prompts!A1:F10`
        #[arg(default_value = "A1:Z100")]
        range: String,
    },

    /// List prompt records from a tab
    Prompts {
        /// Sheet alias from the registry
        alias: String,

        /// Tab holding the prompt records
        tab: String,
    },

    /// Insert a prompt record at the top of a tab
    InsertPrompt {
        /// Sheet alias from the registry
        alias: String,

        /// Tab holding the prompt records
        tab: String,

        /// Prompt name
        name: String,

        /// Prompt content
        content: String,

        /// Author recorded in the audit columns
        #[arg(long)]
        author: Option<String>,
    },
}

/// Daemon management actions.
#[derive(Debug, Subcommand)]
pub enum ServerAction {
    /// Start the daemon in the foreground
    Run,

    /// Show daemon status
    Status,

    /// Stop a running daemon
    Stop,

    /// Check whether the daemon is reachable
    Ping,
}
