//! Character browsing state manager
//!
//! Keeps the observable view state consistent with two remote sources:
//! the paginated listing API and the live favorites collection.
//!
//! # Architecture
//!
//! ```text
//!  StateManager ──Command──►┐
//!                           │
//!  spawned API / store  ────┼─Outcome──► StateLoop ──watch──► observers
//!  calls                    │             (owns state)
//!  Subscription ──Delivery──┘
//! ```
//!
//! Every mutation happens on the state loop task, one message at a time.
//! Remote calls run as separate tasks and post their outcome back to the
//! loop, so any number can be in flight without locking.
//!
//! # Ordering
//!
//! Page fetches and searches carry a sequence number. Only the response to
//! the most recently issued request of each kind is applied; older ones are
//! dropped. Favorites are never touched locally: add/remove only write to the
//! store, and the next subscription delivery replaces the whole set.

use crate::api::{ApiError, CharacterApi};
use crate::config::Config;
use crate::favorites::{FavoritesStore, StoreError};
use crate::models::Character;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

mod state_loop;


use state_loop::{Command, StateLoop};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure recorded by the state manager for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Listing request failed in transport or with a non-success status
    Network(String),
    /// Listing response could not be decoded
    Decode(String),
    /// Favorites put/delete failed
    Write(String),
    /// Favorites listener reported an error
    Subscription(String),
    /// Requested page is outside `1..=total_pages`
    InvalidPage { page: u32, total_pages: u32 },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Decode(msg) => write!(f, "Decode error: {}", msg),
            Self::Write(msg) => write!(f, "Favorites write failed: {}", msg),
            Self::Subscription(msg) => write!(f, "Favorites subscription error: {}", msg),
            Self::InvalidPage { page, total_pages } => {
                write!(f, "Page {} is out of range (1..={})", page, total_pages)
            }
        }
    }
}

impl std::error::Error for StateError {}

impl From<ApiError> for StateError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Decode(msg) => Self::Decode(msg),
        }
    }
}

impl From<StoreError> for StateError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Write(msg) => Self::Write(msg),
            StoreError::Subscription(msg) => Self::Subscription(msg),
        }
    }
}

/// A recorded failure and when it happened
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub error: StateError,
    pub at: DateTime<Utc>,
}

impl OperationFailure {
    pub fn now(error: StateError) -> Self {
        Self {
            error,
            at: Utc::now(),
        }
    }
}

/// Last failure per operation kind
///
/// A slot is cleared by the next success of the same kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationErrors {
    pub fetch: Option<OperationFailure>,
    pub search: Option<OperationFailure>,
    pub favorites: Option<OperationFailure>,
    pub subscription: Option<OperationFailure>,
}

// ─────────────────────────────────────────────────────────────────────────────
// View State
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of everything a view renders
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Characters on the current page
    pub characters: Vec<Character>,
    /// Results of the latest search
    pub search_results: Vec<Character>,
    /// Favorites as last delivered by the store, deduplicated by id
    pub favorites: Vec<Character>,
    /// Page the `characters` belong to (starts at 1)
    pub current_page: u32,
    /// Page count reported with the current page (at least 1)
    pub total_pages: u32,
    /// Whether a page has been applied, i.e. `total_pages` is a real bound
    pub page_loaded: bool,
    /// Trimmed query that `search_results` answers (empty when cleared)
    pub search_query: String,
    pub errors: OperationErrors,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            characters: Vec::new(),
            search_results: Vec::new(),
            favorites: Vec::new(),
            current_page: 1,
            total_pages: 1,
            page_loaded: false,
            search_query: String::new(),
            errors: OperationErrors::default(),
        }
    }
}

impl ViewState {
    /// True if a character with the same id is in the favorites set
    pub fn is_favorite(&self, character: &Character) -> bool {
        self.favorites.iter().any(|f| f.same_entity(character))
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Look a character up in the current page, then search results, then favorites
    pub fn find_character(&self, id: i64) -> Option<&Character> {
        self.characters
            .iter()
            .chain(self.search_results.iter())
            .chain(self.favorites.iter())
            .find(|c| c.id == id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for the state manager
#[derive(Debug, Clone)]
pub struct StateOptions {
    /// Quiet period for [`StateManager::search_as_you_type`]
    pub search_debounce: Duration,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(crate::config::DEFAULT_SEARCH_DEBOUNCE_MS),
        }
    }
}

impl StateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_debounce: Duration::from_millis(config.search_debounce_ms),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the running state loop
///
/// All intents are fire-and-forget: they are queued to the state loop and
/// their effect becomes visible through [`StateManager::subscribe`].
/// Dropping the handle stops the loop and releases the favorites
/// subscription; [`StateManager::shutdown`] does the same and waits for it.
pub struct StateManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ViewState>,
    task: JoinHandle<()>,
}

impl StateManager {
    /// Subscribe to favorites, start the state loop and request page 1
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        api: Arc<dyn CharacterApi>,
        store: Arc<dyn FavoritesStore>,
        options: StateOptions,
    ) -> Result<Self, StoreError> {
        let subscription = store.subscribe()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (publisher, state) = watch::channel(ViewState::default());

        let state_loop = StateLoop::new(api, store, publisher, options);
        let task = tokio::spawn(state_loop.run(commands_rx, subscription));

        let manager = Self {
            commands: commands_tx,
            state,
            task,
        };
        manager.fetch_page(1);
        Ok(manager)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("State loop is not running, dropping command");
        }
    }

    /// Load `page` and make it the current page once it arrives
    ///
    /// Page 0, or a page past the known total, is rejected without a request
    /// and recorded as [`StateError::InvalidPage`].
    pub fn fetch_page(&self, page: u32) {
        self.send(Command::FetchPage(page));
    }

    /// Load the page after the current one
    pub fn next_page(&self) {
        self.send(Command::NextPage);
    }

    /// Load the page before the current one
    pub fn previous_page(&self) {
        self.send(Command::PreviousPage);
    }

    /// Search by name; an empty or blank query clears the results
    pub fn search(&self, query: &str) {
        self.send(Command::Search(query.to_string()));
    }

    /// Debounced search for text-field input
    ///
    /// Each call restarts the quiet period; only the last query of a burst
    /// is searched.
    pub fn search_as_you_type(&self, query: &str) {
        self.send(Command::SearchInput(query.to_string()));
    }

    /// Write `character` to the favorites store unless it is already a favorite
    pub fn add_to_favorites(&self, character: Character) {
        self.send(Command::AddFavorite(character));
    }

    /// Delete `character` from the favorites store if it is a favorite
    pub fn remove_from_favorites(&self, character: Character) {
        self.send(Command::RemoveFavorite(character));
    }

    /// Add or remove depending on the current favorites set
    pub fn toggle_favorite(&self, character: Character) {
        self.send(Command::ToggleFavorite(character));
    }

    /// Whether the last delivered favorites set contains this character's id
    pub fn is_favorite(&self, character: &Character) -> bool {
        self.state.borrow().is_favorite(character)
    }

    pub fn find_character(&self, id: i64) -> Option<Character> {
        self.state.borrow().find_character(id).cloned()
    }

    /// Current snapshot
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Wait until the state loop has handled every command sent so far
    ///
    /// Outcomes and deliveries already queued when the loop reaches this
    /// point are applied too. Remote calls still in flight are not waited on.
    pub async fn sync(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Sync(tx));
        let _ = rx.await;
    }

    /// Stop the state loop, release the favorites subscription and wait
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::error!("State loop ended abnormally: {}", e);
        }
    }
}
