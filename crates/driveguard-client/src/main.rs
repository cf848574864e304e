//! driveguard CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use driveguard_core::{TracingConfig, init_tracing};

use driveguard_client::cli::{
    AuthAction, Cli, Command, ConfigAction, DriveAction, ServerAction, SheetsAction,
};
use driveguard_client::commands;
use driveguard_client::config::ClientConfig;
use driveguard_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The daemon logs structured JSON; everything else is compact
    let tracing_config = match cli.command {
        Command::Server {
            action: ServerAction::Run,
        } => TracingConfig::daemon(),
        _ => TracingConfig::cli(cli.debug),
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let paths = cli.paths();
    let config = ClientConfig::load(&paths).map_err(ClientError::Config)?;
    let profile = config.profile(cli.profile.as_deref());

    match &cli.command {
        Command::Auth { action } => match action {
            AuthAction::Login {
                force,
                credentials_file,
            } => {
                commands::auth::login(&paths, &profile, *force, credentials_file.as_deref()).await
            }
            AuthAction::Status => commands::auth::status(&paths, &profile),
            AuthAction::Logout => commands::auth::logout(&paths, &profile),
        },

        Command::Config { action } => match action {
            ConfigAction::ListSheets => commands::config::list_sheets(&paths),
            ConfigAction::ListFolders => commands::config::list_folders(&paths),
            ConfigAction::Path => commands::config::path(&paths),
            ConfigAction::Validate => commands::config::validate(&paths),
        },

        Command::Drive { action } => match action {
            DriveAction::List { folder } => commands::drive::list(&paths, folder).await,
            DriveAction::ListAll => commands::drive::list_all(&paths, &profile).await,
            DriveAction::Upload { folder, path, name } => {
                commands::drive::upload(&paths, folder, path, name.as_deref()).await
            }
            DriveAction::Download {
                folder,
                file_id,
                output,
            } => commands::drive::download(&paths, folder, file_id, output.as_deref()).await,
            DriveAction::Delete { folder, file_id } => {
                commands::drive::delete(&paths, folder, file_id).await
            }
        },

        Command::Sheets { action } => match action {
            SheetsAction::Tabs { alias } => commands::sheets::tabs(&paths, alias).await,
            SheetsAction::Values { alias, range } => {
                commands::sheets::values(&paths, alias, range).await
            }
            SheetsAction::Prompts { alias, tab } => {
                commands::sheets::prompts(&paths, alias, tab).await
            }
            SheetsAction::InsertPrompt {
                alias,
                tab,
                name,
                content,
                author,
            } => {
                commands::sheets::insert_prompt(&paths, alias, tab, name, content, author.as_deref())
                    .await
            }
        },

        Command::Server { action } => match action {
            ServerAction::Run => commands::server::run(&cli, &config).await,
            ServerAction::Status => commands::server::status(&cli, &config).await,
            ServerAction::Stop => commands::server::stop(&cli, &config).await,
            ServerAction::Ping => commands::server::ping(&cli, &config).await,
        },
    }
}
