//! rickdex - browse Rick and Morty characters and keep a synced favorites list
//!
//! The [`state::StateManager`] keeps an observable [`state::ViewState`]
//! consistent with two remote sources: the paginated character listing
//! ([`api::CharacterApi`]) and a live favorites collection
//! ([`favorites::FavoritesStore`]).

pub mod api;
pub mod config;
pub mod favorites;
pub mod logging;
pub mod models;
pub mod state;
