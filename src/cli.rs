// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - page [N] [--favorite ID]...: Print one page of the character listing
//   (default: 1), marking the given characters as favorites first
// - search <NAME>: Print characters matching a name
// - config --show: Display effective configuration
// - config --path: Show config file path

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rickdex::config::{Config, VERSION};
use rickdex::models::Character;
use rickdex::state::{OperationFailure, StateManager, ViewState};
use std::time::Duration;
use tokio::sync::watch;

/// How long a command waits for the state to settle
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

/// rickdex - Browse Rick and Morty characters
#[derive(Parser, Debug)]
#[command(name = "rickdex")]
#[command(version = VERSION)]
#[command(about = "Browse Rick and Morty characters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Print one page of the character listing
    Page {
        /// Page number, starting at 1
        page: Option<u32>,

        /// Add the character with this id (on the page) to favorites
        #[arg(long = "favorite", value_name = "ID")]
        favorites: Vec<i64>,
    },

    /// Search characters by name
    Search {
        /// Name (or part of a name) to search for
        name: String,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config subcommand
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_config(show: bool, path: bool) -> Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show()
    } else {
        // No flag provided, show help
        println!("Usage: rickdex config [--show|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
        Ok(())
    }
}

fn handle_config_path() -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Browsing subcommands
// ─────────────────────────────────────────────────────────────────────────────

/// Wait until `done` holds for the published state
async fn settle(
    manager: &StateManager,
    done: impl FnMut(&ViewState) -> bool,
) -> Result<ViewState> {
    let mut states: watch::Receiver<ViewState> = manager.subscribe();
    let state = tokio::time::timeout(SETTLE_TIMEOUT, states.wait_for(done))
        .await
        .context("Timed out waiting for the character API")?
        .context("State manager stopped")?;
    Ok(state.clone())
}

pub async fn handle_page(manager: &StateManager, page: u32, favorites: &[i64]) -> Result<()> {
    let state = load_page(manager, page, favorites).await?;

    println!("Page {}/{}", state.current_page, state.total_pages);
    print_characters(&state.characters, &state);
    if !state.favorites.is_empty() {
        println!();
        println!("{} favorite(s)", state.favorites.len());
    }
    Ok(())
}

/// Load `page`, then add the listed characters to favorites
///
/// Returns once the page is current and every added character shows up in
/// the favorites delivered back by the store.
async fn load_page(manager: &StateManager, page: u32, favorites: &[i64]) -> Result<ViewState> {
    // Supersedes the page 1 request issued at startup
    if page != 1 {
        manager.fetch_page(page);
    }

    let state = settle(manager, |s| {
        (s.page_loaded && s.current_page == page) || s.errors.fetch.is_some()
    })
    .await?;
    check_failure(state.errors.fetch.as_ref())?;

    if favorites.is_empty() {
        return Ok(state);
    }

    let mut added = Vec::with_capacity(favorites.len());
    for &id in favorites {
        match state.characters.iter().find(|c| c.id == id) {
            Some(character) => {
                manager.add_to_favorites(character.clone());
                added.push(character.clone());
            }
            None => bail!("Character {} is not on page {}", id, page),
        }
    }

    let state = settle(manager, |s| {
        added.iter().all(|c| s.is_favorite(c)) || s.errors.favorites.is_some()
    })
    .await?;
    check_failure(state.errors.favorites.as_ref())?;
    Ok(state)
}

pub async fn handle_search(manager: &StateManager, name: &str) -> Result<()> {
    let query = name.trim();
    if query.is_empty() {
        bail!("Search name must not be empty");
    }

    manager.search(query);
    let state = settle(manager, |s| s.search_query == query).await?;
    check_failure(state.errors.search.as_ref())?;

    if state.search_results.is_empty() {
        println!("No matches for {:?}", query);
    } else {
        print_characters(&state.search_results, &state);
    }
    Ok(())
}

fn check_failure(failure: Option<&OperationFailure>) -> Result<()> {
    if let Some(failure) = failure {
        bail!("{} (at {})", failure.error, failure.at.to_rfc3339());
    }
    Ok(())
}

fn print_characters(characters: &[Character], state: &ViewState) {
    for character in characters {
        let marker = if state.is_favorite(character) { "*" } else { " " };
        println!(
            "{} {:>4}  {:<32} {}",
            marker,
            character.id,
            character.name,
            format_origin(character)
        );
    }
}

fn format_origin(character: &Character) -> String {
    if character.origin.name.is_empty() {
        "unknown origin".to_string()
    } else {
        character.origin.name.clone()
    }
}
