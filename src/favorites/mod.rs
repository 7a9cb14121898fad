//! Remote favorites store abstraction
//!
//! Favorites live in a remote document collection named `"favorites"`.
//! Each document is keyed by the character's stringified id and holds the
//! serialized [`Character`].
//!
//! # Subscription Model
//!
//! ```text
//! store.subscribe() ──► Subscription ──► Delivery (full collection)
//!        │                                  ▲
//!        └── put / delete ── change ────────┘
//! ```
//!
//! A delivery is always the **full** current collection, never a diff, and
//! one is pushed immediately on subscribe. Consumers must treat every
//! delivery as an authoritative replacement. Deliveries of rapid writes are
//! not guaranteed to arrive in write order.
//!
//! A [`Subscription`] is a scoped acquisition: the listener stays registered
//! until [`Subscription::release`] is called or the handle is dropped.

use crate::models::Character;
use futures::future::BoxFuture;
use std::fmt;
use tokio::sync::mpsc;

mod memory;

pub use memory::MemoryFavoritesStore;

/// Name of the remote collection holding favorites
pub const FAVORITES_COLLECTION: &str = "favorites";

/// Key of a character's document in the favorites collection
pub fn document_key(id: i64) -> String {
    id.to_string()
}

/// Errors reported by a favorites store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A put or delete failed
    Write(String),
    /// The store's listener reported an error (or could not be registered)
    Subscription(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(msg) => write!(f, "Favorites write failed: {}", msg),
            Self::Subscription(msg) => write!(f, "Favorites subscription error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// One push from the store: the full collection, or a listener error
pub type Delivery = Result<Vec<Character>, StoreError>;

/// Remote favorites collection
pub trait FavoritesStore: Send + Sync {
    /// Upsert the document for `id`
    fn put(&self, id: i64, character: &Character) -> BoxFuture<'static, Result<(), StoreError>>;

    /// Delete the document for `id` (no-op if absent)
    fn delete(&self, id: i64) -> BoxFuture<'static, Result<(), StoreError>>;

    /// Register a listener
    ///
    /// The current collection must already be queued on the returned
    /// subscription when this returns.
    fn subscribe(&self) -> Result<Subscription, StoreError>;
}

/// Live listener registration
///
/// Deliveries are buffered in an unbounded channel so the store never blocks
/// on a slow consumer.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a delivery channel and the action that unregisters the listener
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Delivery>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next delivery
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Take a delivery if one is already queued
    pub fn try_next(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }

    /// Unregister the listener now
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            self.receiver.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let (_tx, rx) = mpsc::unbounded_channel();

        let subscription = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.release();

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let (_tx, rx) = mpsc::unbounded_channel();

        {
            let _subscription = Subscription::new(rx, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_next_returns_queued_delivery() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = Subscription::new(rx, || {});

        assert!(subscription.try_next().is_none());
        tx.send(Ok(vec![Character::new(1, "Rick")])).unwrap();
        let delivery = subscription.try_next().unwrap().unwrap();
        assert_eq!(delivery[0].id, 1);
    }

    #[test]
    fn test_document_key_is_stringified_id() {
        assert_eq!(document_key(7), "7");
        assert_eq!(document_key(-1), "-1");
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Write("permission denied".to_string()).to_string(),
            "Favorites write failed: permission denied"
        );
    }
}
