//! The task that owns and mutates the view state

use super::{OperationFailure, StateError, StateOptions, ViewState};
use crate::api::{ApiError, CharacterApi};
use crate::favorites::{Delivery, FavoritesStore, StoreError, Subscription};
use crate::models::{dedup_by_id, Character, Page};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Intents sent by the [`super::StateManager`] handle
#[derive(Debug)]
pub(super) enum Command {
    FetchPage(u32),
    NextPage,
    PreviousPage,
    Search(String),
    SearchInput(String),
    AddFavorite(Character),
    RemoveFavorite(Character),
    ToggleFavorite(Character),
    Sync(oneshot::Sender<()>),
}

/// Results posted back by spawned remote calls and timers
#[derive(Debug)]
enum Outcome {
    PageLoaded {
        seq: u64,
        page: u32,
        result: Result<Page, ApiError>,
    },
    SearchLoaded {
        seq: u64,
        query: String,
        result: Result<Page, ApiError>,
    },
    DebounceElapsed {
        token: u64,
        query: String,
    },
    WriteFinished {
        action: FavoriteAction,
        id: i64,
        result: Result<(), StoreError>,
    },
}

#[derive(Debug, Clone, Copy)]
enum FavoriteAction {
    Add,
    Remove,
}

/// Which error slot an operation reports into
#[derive(Debug, Clone, Copy)]
enum Operation {
    Fetch,
    Search,
    Favorites,
    Subscription,
}

pub(super) struct StateLoop {
    api: Arc<dyn CharacterApi>,
    store: Arc<dyn FavoritesStore>,
    publisher: watch::Sender<ViewState>,
    options: StateOptions,
    state: ViewState,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
    /// Sequence number of the latest page request
    page_seq: u64,
    /// Sequence number of the latest search (including cleared searches)
    search_seq: u64,
    /// Token of the latest search-as-you-type input
    debounce_token: u64,
}

impl StateLoop {
    pub(super) fn new(
        api: Arc<dyn CharacterApi>,
        store: Arc<dyn FavoritesStore>,
        publisher: watch::Sender<ViewState>,
        options: StateOptions,
    ) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            api,
            store,
            publisher,
            options,
            state: ViewState::default(),
            outcomes_tx,
            outcomes_rx,
            page_seq: 0,
            search_seq: 0,
            debounce_token: 0,
        }
    }

    /// Run until the command channel closes
    ///
    /// The subscription is owned here so it is released when the loop ends.
    pub(super) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        subscription: Subscription,
    ) {
        tracing::info!(
            "State loop started (api: {}, search debounce: {:?})",
            self.api.name(),
            self.options.search_debounce
        );

        let mut subscription = Some(subscription);

        // Queued outcomes and deliveries are applied before the next command
        loop {
            tokio::select! {
                biased;

                Some(outcome) = self.outcomes_rx.recv() => self.handle_outcome(outcome),
                delivery = next_delivery(&mut subscription) => match delivery {
                    Some(delivery) => {
                        let delivery = latest_delivery(&mut subscription, delivery);
                        self.apply_delivery(delivery)
                    }
                    None => {
                        tracing::warn!("Favorites subscription closed by the store");
                        subscription = None;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        if let Some(subscription) = subscription {
            subscription.release();
        }
        tracing::info!("State loop stopped");
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn record(&mut self, operation: Operation, error: StateError) {
        let failure = Some(OperationFailure::now(error));
        match operation {
            Operation::Fetch => self.state.errors.fetch = failure,
            Operation::Search => self.state.errors.search = failure,
            Operation::Favorites => self.state.errors.favorites = failure,
            Operation::Subscription => self.state.errors.subscription = failure,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::FetchPage(page) => self.fetch_page(page),
            Command::NextPage => self.fetch_page(self.state.current_page.saturating_add(1)),
            Command::PreviousPage => self.fetch_page(self.state.current_page.saturating_sub(1)),
            Command::Search(query) => self.search(query),
            Command::SearchInput(query) => self.debounce_search(query),
            Command::AddFavorite(character) => self.add_favorite(character),
            Command::RemoveFavorite(character) => self.remove_favorite(character),
            Command::ToggleFavorite(character) => {
                if self.state.is_favorite(&character) {
                    self.remove_favorite(character)
                } else {
                    self.add_favorite(character)
                }
            }
            Command::Sync(done) => {
                let _ = done.send(());
            }
        }
    }

    fn check_page_bounds(&self, page: u32) -> Result<(), StateError> {
        let out_of_range =
            page == 0 || (self.state.page_loaded && page > self.state.total_pages);
        if out_of_range {
            return Err(StateError::InvalidPage {
                page,
                total_pages: self.state.total_pages,
            });
        }
        Ok(())
    }

    fn fetch_page(&mut self, page: u32) {
        if let Err(error) = self.check_page_bounds(page) {
            tracing::warn!("Rejected page request: {}", error);
            self.record(Operation::Fetch, error);
            self.publish();
            return;
        }

        self.page_seq += 1;
        let seq = self.page_seq;
        tracing::debug!("Fetching page {} (seq {})", page, seq);

        let request = self.api.fetch_page(page);
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = tx.send(Outcome::PageLoaded { seq, page, result });
        });
    }

    fn search(&mut self, query: String) {
        // A direct search supersedes pending debounced input
        self.debounce_token += 1;
        self.search_seq += 1;
        let seq = self.search_seq;

        let query = query.trim().to_string();
        if query.is_empty() {
            tracing::debug!("Empty search query, clearing results (seq {})", seq);
            self.state.search_results.clear();
            self.state.search_query.clear();
            self.state.errors.search = None;
            self.publish();
            return;
        }

        tracing::debug!("Searching for {:?} (seq {})", query, seq);
        let request = self.api.search_by_name(&query);
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = tx.send(Outcome::SearchLoaded { seq, query, result });
        });
    }

    fn debounce_search(&mut self, query: String) {
        self.debounce_token += 1;
        let token = self.debounce_token;
        let delay = self.options.search_debounce;
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Outcome::DebounceElapsed { token, query });
        });
    }

    fn add_favorite(&mut self, character: Character) {
        if self.state.is_favorite(&character) {
            tracing::debug!("Character {} is already a favorite", character.id);
            return;
        }

        let id = character.id;
        tracing::debug!("Adding character {} to favorites", id);
        let request = self.store.put(id, &character);
        self.spawn_write(FavoriteAction::Add, id, request);
    }

    fn remove_favorite(&mut self, character: Character) {
        if !self.state.is_favorite(&character) {
            tracing::debug!("Character {} is not a favorite", character.id);
            return;
        }

        let id = character.id;
        tracing::debug!("Removing character {} from favorites", id);
        let request = self.store.delete(id);
        self.spawn_write(FavoriteAction::Remove, id, request);
    }

    fn spawn_write(
        &self,
        action: FavoriteAction,
        id: i64,
        request: futures::future::BoxFuture<'static, Result<(), StoreError>>,
    ) {
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = tx.send(Outcome::WriteFinished { action, id, result });
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outcomes
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::PageLoaded { seq, page, result } => self.apply_page(seq, page, result),
            Outcome::SearchLoaded { seq, query, result } => {
                self.apply_search(seq, &query, result)
            }
            Outcome::DebounceElapsed { token, query } => {
                if token == self.debounce_token {
                    self.search(query);
                }
            }
            Outcome::WriteFinished { action, id, result } => {
                self.apply_write(action, id, result)
            }
        }
    }

    fn apply_page(&mut self, seq: u64, page: u32, result: Result<Page, ApiError>) {
        if seq != self.page_seq {
            tracing::debug!(
                "Discarding stale response for page {} (seq {}, latest {})",
                page,
                seq,
                self.page_seq
            );
            return;
        }

        match result {
            Ok(response) => {
                tracing::debug!(
                    "Loaded page {}/{} with {} characters",
                    page,
                    response.info.pages,
                    response.results.len()
                );
                self.state.characters = response.results;
                self.state.current_page = page;
                self.state.total_pages = response.info.pages.max(1);
                self.state.errors.fetch = None;
                self.state.page_loaded = true;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch page {}: {}", page, e);
                self.record(Operation::Fetch, e.into());
            }
        }
        self.publish();
    }

    fn apply_search(&mut self, seq: u64, query: &str, result: Result<Page, ApiError>) {
        if seq != self.search_seq {
            tracing::debug!(
                "Discarding stale search response for {:?} (seq {}, latest {})",
                query,
                seq,
                self.search_seq
            );
            return;
        }

        match result {
            Ok(response) => {
                tracing::debug!(
                    "Search {:?} returned {} characters",
                    query,
                    response.results.len()
                );
                self.state.search_results = response.results;
                self.state.search_query = query.to_string();
                self.state.errors.search = None;
            }
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                self.state.search_results.clear();
                self.state.search_query = query.to_string();
                self.record(Operation::Search, e.into());
            }
        }
        self.publish();
    }

    fn apply_write(&mut self, action: FavoriteAction, id: i64, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                tracing::debug!("Favorites {:?} for character {} accepted", action, id);
                if self.state.errors.favorites.take().is_some() {
                    self.publish();
                }
            }
            Err(e) => {
                tracing::warn!("Favorites {:?} for character {} failed: {}", action, id, e);
                self.record(Operation::Favorites, e.into());
                self.publish();
            }
        }
    }

    fn apply_delivery(&mut self, delivery: Delivery) {
        match delivery {
            Ok(characters) => {
                let favorites = dedup_by_id(characters);
                tracing::debug!("Favorites delivery with {} characters", favorites.len());
                self.state.favorites = favorites;
                self.state.errors.subscription = None;
            }
            Err(e) => {
                tracing::warn!("Favorites listener error: {}", e);
                self.record(Operation::Subscription, e.into());
            }
        }
        self.publish();
    }
}

/// Skip to the newest queued delivery
///
/// Every delivery is a full replacement, so older queued ones are redundant.
fn latest_delivery(subscription: &mut Option<Subscription>, first: Delivery) -> Delivery {
    let mut latest = first;
    if let Some(subscription) = subscription {
        while let Some(newer) = subscription.try_next() {
            latest = newer;
        }
    }
    latest
}

/// Next delivery, or never if the subscription is gone
async fn next_delivery(subscription: &mut Option<Subscription>) -> Option<Delivery> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
