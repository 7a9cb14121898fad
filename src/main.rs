// rickdex - headless character browser
//
// Drives the state manager from the command line: loads a page of the
// character listing or runs a name search, then prints the result.
//
// Architecture:
// - Listing client (reqwest): fetches pages and name searches
// - Favorites store: in-process document collection with live listeners
// - State manager: single task owning the view state, published via watch

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rickdex::api::HttpCharacterApi;
use rickdex::config::Config;
use rickdex::favorites::MemoryFavoritesStore;
use rickdex::logging;
use rickdex::state::{StateManager, StateOptions};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands run before anything is initialized
    if let Some(Commands::Config { show, path }) = cli.command {
        return cli::handle_config(show, path);
    }

    // Create config file with defaults on first run
    Config::ensure_config_exists();
    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init(&config.logging)?;

    tracing::info!(
        "rickdex {} starting (api: {})",
        rickdex::config::VERSION,
        config.api_url
    );

    let api = HttpCharacterApi::from_config(&config)
        .context("Failed to create the character API client")?;
    let store = MemoryFavoritesStore::new();

    let manager = StateManager::start(
        Arc::new(api),
        Arc::new(store),
        StateOptions::from_config(&config),
    )
    .context("Failed to subscribe to favorites")?;

    let result = match cli.command {
        Some(Commands::Search { name }) => cli::handle_search(&manager, &name).await,
        Some(Commands::Page { page, favorites }) => {
            cli::handle_page(&manager, page.unwrap_or(1), &favorites).await
        }
        // No subcommand: show the first page
        None | Some(Commands::Config { .. }) => cli::handle_page(&manager, 1, &[]).await,
    };

    manager.shutdown().await;
    result
}
