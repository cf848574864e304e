//! Server commands: daemon startup and management.
//!
//! `run` orchestrates the daemon components in the foreground: PID file,
//! signal handler, registry, shared state, and the socket server. The
//! other commands talk to a running daemon over its socket.

use std::time::Duration;

use tracing::{info, warn};

use driveguard_core::ResourceRegistry;
use driveguard_server::{
    PidFile, ServerConfig, Signals, SocketServer, default_pid_path, make_connection_handler,
    new_shared_state,
};

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::socket::SocketClient;

fn socket_client(cli: &Cli, config: &ClientConfig) -> SocketClient {
    let socket_path = config.socket_path(cli.socket_path.as_deref());
    SocketClient::new(socket_path, config.timeout())
}

/// Starts the daemon in the foreground.
///
/// Blocks until a shutdown signal (SIGTERM/SIGINT) or a Shutdown request
/// arrives. SIGHUP reloads the registry without restarting.
pub async fn run(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let paths = cli.paths();

    // 1. Registry
    let registry = ResourceRegistry::load(paths.registry_path());
    if registry.is_empty() {
        warn!(
            path = %paths.registry_path().display(),
            "registry is empty; every alias lookup will fail"
        );
    }
    info!(
        sheets = registry.sheets.len(),
        folders = registry.drive_folders.len(),
        "registry loaded"
    );

    // 2. PID file (prevents duplicate daemon instances)
    let _pid_file = PidFile::acquire(default_pid_path())
        .map_err(|e| ClientError::Config(format!("failed to create PID file: {}", e)))?;

    // 3. Signals
    let signals = Signals::install();
    let shutdown = signals.shutdown_handle();

    // 4. Shared state, wired so a Shutdown request stops the accept loop
    let state = new_shared_state(registry, paths.clone());
    {
        let mut s = state.write().await;
        s.set_shutdown_handle(shutdown.clone());
    }

    // 5. Registry reload on SIGHUP
    let reload_state = state.clone();
    let reload_registry_path = paths.registry_path();
    let mut reloads = signals.reload_watcher();
    tokio::spawn(async move {
        while reloads.next().await {
            let registry = ResourceRegistry::load(&reload_registry_path);
            info!(
                sheets = registry.sheets.len(),
                folders = registry.drive_folders.len(),
                "registry reloaded"
            );
            reload_state.write().await.set_registry(registry);
        }
    });

    // 6. Socket server
    let socket_path = config.socket_path(cli.socket_path.as_deref());
    let server_config =
        ServerConfig::new(&socket_path).with_connection_timeout(config.timeout());
    let server = SocketServer::bind(server_config)
        .await
        .map_err(|e| ClientError::Config(format!("failed to start socket server: {}", e)))?;

    info!(path = %socket_path.display(), "server listening");

    let handler = make_connection_handler(state.clone());

    let shutdown_wait = shutdown.clone();
    server
        .serve(handler, async move { shutdown_wait.triggered().await })
        .await
        .map_err(|e| ClientError::Config(format!("server error: {}", e)))?;

    // Let in-flight connection tasks finish their final writes
    info!("shutting down");
    tokio::time::sleep(Duration::from_millis(100)).await;

    info!("server stopped");
    Ok(())
}

/// Shows daemon status.
pub async fn status(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let client = socket_client(cli, config);

    if !client.socket_exists() {
        println!("Daemon is not running (no socket at {}).", client.socket_path().display());
        return Ok(());
    }

    let info = client.status().await?;
    println!("Daemon running.");
    println!("Uptime:   {}", format_uptime(info.uptime_seconds));
    println!("Sheets:   {}", info.sheet_count);
    println!("Folders:  {}", info.folder_count);
    println!(
        "Profiles: {}",
        if info.profiles.is_empty() {
            "(none)".to_string()
        } else {
            info.profiles.join(", ")
        }
    );
    Ok(())
}

/// Stops a running daemon.
pub async fn stop(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let client = socket_client(cli, config);

    if !client.socket_exists() {
        println!("Daemon is not running.");
        return Ok(());
    }

    client.shutdown().await?;
    println!("Daemon stopped.");
    Ok(())
}

/// Checks whether the daemon is reachable.
pub async fn ping(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let client = socket_client(cli, config);

    if client.ping().await? {
        println!("Daemon is alive at {}.", client.socket_path().display());
        Ok(())
    } else {
        Err(ClientError::Connection(format!(
            "daemon not reachable at {}",
            client.socket_path().display()
        )))
    }
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
