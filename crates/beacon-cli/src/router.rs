//! Command routing logic for CLI

use crate::args::{CacheAction, Cli, Commands, DEFAULT_CONFIG_FILE};
use crate::commands;
use crate::console::CliConsole;
use crate::logging;
use anyhow::Context;
use beacon_core::{ClientConfig, DataLayer, load_config};
use std::path::{Path, PathBuf};

/// Directory under the platform data dir used when no storage dir is configured
const DATA_DIR_NAME: &str = "beacon";

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose);

    let console = CliConsole::new(cli.verbose);
    let layer = DataLayer::builder(config)
        .build()
        .await
        .context("Failed to start the data layer")?;

    let result = match cli.command {
        Commands::Login { email, password } => {
            commands::session::login(&layer, &console, &email, &password).await
        }
        Commands::Logout => commands::session::logout(&layer, &console).await,
        Commands::Whoami => commands::session::whoami(&layer, &console),
        Commands::Get {
            path,
            ttl_ms,
            reload,
            no_store,
        } => {
            let args = commands::request::GetArgs {
                path,
                ttl_ms,
                reload,
                no_store,
            };
            commands::request::get(&layer, &console, args).await
        }
        Commands::Send { method, path, body } => {
            commands::request::send(&layer, &console, method, &path, body.as_deref()).await
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache::stats(&layer, &console),
            CacheAction::Clear => commands::cache::clear(&layer, &console).await,
            CacheAction::Prune => commands::cache::prune(&layer, &console).await,
        },
    };

    layer.shutdown();
    if let Err(e) = &result {
        console.error(&format!("{:#}", e));
    }
    result
}

/// Load configuration and fill in the default storage directory
///
/// An explicit `--config` must exist; the default file is optional.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<ClientConfig> {
    let default_file = PathBuf::from(DEFAULT_CONFIG_FILE);
    let path = match explicit {
        Some(path) => Some(path),
        None if default_file.exists() => Some(default_file.as_path()),
        None => None,
    };

    let mut config = load_config(path).context("Failed to load configuration")?;
    if config.storage.dir.is_none() {
        config.storage.dir = default_storage_dir();
    }
    Ok(config)
}

fn default_storage_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(DATA_DIR_NAME))
}
