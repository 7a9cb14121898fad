//! In-process favorites collection with real listener fan-out
//!
//! Behaves like the remote store from a subscriber's point of view:
//! documents are JSON bodies keyed by stringified id, every change pushes
//! the full collection to every listener, and undecodable documents are
//! skipped. Clones share the same collection.

use super::{
    document_key, Delivery, FavoritesStore, StoreError, Subscription, FAVORITES_COLLECTION,
};
use crate::models::Character;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    documents: Mutex<BTreeMap<String, serde_json::Value>>,
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<Delivery>>>,
    next_listener_id: AtomicU64,
}

impl Inner {
    fn documents(&self) -> MutexGuard<'_, BTreeMap<String, serde_json::Value>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<Delivery>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decode the current collection, skipping documents that don't parse
    fn snapshot(&self) -> Vec<Character> {
        decode_all(&self.documents())
    }

    /// Apply a change to the documents and push the result to every listener
    ///
    /// The listener table is held across the change and the broadcast, so
    /// deliveries go out in write order and the last one always matches
    /// the collection. Lock order is listeners, then documents.
    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut BTreeMap<String, serde_json::Value>) -> bool,
    {
        let mut listeners = self.listeners();
        let snapshot = {
            let mut documents = self.documents();
            if !change(&mut documents) {
                return;
            }
            decode_all(&documents)
        };
        broadcast(&mut listeners, Ok(snapshot));
    }

    fn write_document(&self, key: String, body: serde_json::Value) {
        self.update(|documents| {
            documents.insert(key, body);
            true
        });
    }

    fn remove_document(&self, key: &str) {
        self.update(|documents| documents.remove(key).is_some());
    }
}

fn decode_all(documents: &BTreeMap<String, serde_json::Value>) -> Vec<Character> {
    documents
        .iter()
        .filter_map(|(key, body)| {
            match serde_json::from_value::<Character>(body.clone()) {
                Ok(character) => Some(character),
                Err(e) => {
                    tracing::warn!(
                        "Skipping undecodable {} document {}: {}",
                        FAVORITES_COLLECTION,
                        key,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Push a delivery to every live listener, pruning closed ones
fn broadcast(listeners: &mut HashMap<u64, mpsc::UnboundedSender<Delivery>>, delivery: Delivery) {
    listeners.retain(|_, tx| tx.send(delivery.clone()).is_ok());
    tracing::trace!("Delivered favorites to {} listener(s)", listeners.len());
}

/// Favorites collection held in memory
#[derive(Clone, Default)]
pub struct MemoryFavoritesStore {
    inner: Arc<Inner>,
}

impl MemoryFavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw document, as another client of the collection would
    pub fn put_document(&self, key: impl Into<String>, body: serde_json::Value) {
        self.inner.write_document(key.into(), body);
    }

    /// Deliver a listener error to every subscriber
    pub fn report_error(&self, message: impl Into<String>) {
        broadcast(
            &mut self.inner.listeners(),
            Err(StoreError::Subscription(message.into())),
        );
    }

    /// Number of registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

impl FavoritesStore for MemoryFavoritesStore {
    fn put(&self, id: i64, character: &Character) -> BoxFuture<'static, Result<(), StoreError>> {
        let inner = self.inner.clone();
        let body = serde_json::to_value(character);
        async move {
            let body = body.map_err(|e| StoreError::Write(e.to_string()))?;
            inner.write_document(document_key(id), body);
            Ok(())
        }
        .boxed()
    }

    fn delete(&self, id: i64) -> BoxFuture<'static, Result<(), StoreError>> {
        let inner = self.inner.clone();
        async move {
            inner.remove_document(&document_key(id));
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);

        // Hold the listener table so no write can broadcast between the
        // initial snapshot and registration
        {
            let mut listeners = self.inner.listeners();
            tx.send(Ok(self.inner.snapshot()))
                .map_err(|e| StoreError::Subscription(e.to_string()))?;
            listeners.insert(id, tx);
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners().remove(&id);
                tracing::debug!("Released favorites listener {}", id);
            }
        }))
    }
}
