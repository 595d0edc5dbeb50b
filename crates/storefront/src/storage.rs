//! Key/value storage backing the cart snapshot and the offline queues.
//!
//! Two backends implement [`KeyValueStore`]:
//! - [`SessionStorage`] - per-visitor values held in the tower-sessions session
//!   (the cart snapshot under `cart-storage`, the analytics client id under
//!   `analytics-client-id`)
//! - [`MemoryStorage`] - process-wide values shared by background tasks
//!
//! [`MemoryStorage`] also holds the `offline_cart` and `offline_analytics`
//! queues. Queue entries are plain JSON values with no versioning, each tagged
//! with a sequence number so a sync can acknowledge exactly what it sent.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use panel_labels_core::persist::{CART_STORAGE_KEY, CART_STORAGE_VERSION};
use panel_labels_core::{CartState, PersistError, PersistedState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_sessions::Session;
use uuid::Uuid;

/// Session key holding the visitor's analytics client id.
pub const CLIENT_ID_KEY: &str = "analytics-client-id";

/// Errors reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot error: {0}")]
    Persist(#[from] PersistError),
}

/// Async string key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get_raw(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store a raw value under `key`, replacing any previous value.
    fn set_raw(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

// =============================================================================
// Session Storage
// =============================================================================

/// Per-visitor storage in the tower-sessions session.
#[derive(Clone, Debug)]
pub struct SessionStorage(Session);

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }
}

impl KeyValueStore for SessionStorage {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.0.get::<String>(key).await?)
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        Ok(self.0.insert(key, value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.0.remove::<String>(key).await?;
        Ok(())
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

#[derive(Debug, Default)]
struct Queue {
    next_seq: u64,
    entries: VecDeque<(u64, Value)>,
}

/// Entries read from a queue, with the sequence number to acknowledge once
/// they are delivered.
#[derive(Debug, Default)]
pub struct QueueSnapshot {
    pub entries: Vec<Value>,
    pub through: Option<u64>,
}

/// Process-wide in-memory storage. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    queues: Arc<RwLock<HashMap<String, Queue>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the queue under `key`.
    ///
    /// Queued entries for which `supersedes` returns true are removed first.
    /// When the queue then holds more than `limit` entries the oldest are
    /// dropped. Returns the queue length after the append.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry fails to serialize.
    pub async fn push_entry<T: Serialize + Sync>(
        &self,
        key: &str,
        entry: &T,
        supersedes: impl Fn(&Value) -> bool + Send,
        limit: usize,
    ) -> Result<usize, StorageError> {
        let value = serde_json::to_value(entry)?;
        let mut queues = self.queues.write().await;
        let queue = queues.entry(key.to_string()).or_default();

        queue.entries.retain(|(_, queued)| !supersedes(queued));
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.entries.push_back((seq, value));

        let overflow = queue.entries.len().saturating_sub(limit);
        if overflow > 0 {
            queue.entries.drain(..overflow);
            tracing::warn!(key, dropped = overflow, "Offline queue full, dropped oldest entries");
        }
        Ok(queue.entries.len())
    }

    /// Read every entry of the queue under `key`.
    pub async fn snapshot(&self, key: &str) -> QueueSnapshot {
        let queues = self.queues.read().await;
        let Some(queue) = queues.get(key) else {
            return QueueSnapshot::default();
        };
        QueueSnapshot {
            entries: queue.entries.iter().map(|(_, value)| value.clone()).collect(),
            through: queue.entries.back().map(|(seq, _)| *seq),
        }
    }

    /// Read every entry of the queue under `key` as `T`.
    ///
    /// Entries that do not match `T` are skipped.
    pub async fn entries<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.snapshot(key)
            .await
            .entries
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Skipping malformed queue entry");
                    None
                }
            })
            .collect()
    }

    /// Number of entries queued under `key`.
    pub async fn queue_len(&self, key: &str) -> usize {
        self.queues
            .read()
            .await
            .get(key)
            .map_or(0, |queue| queue.entries.len())
    }

    /// Remove every entry up to and including sequence number `through`.
    ///
    /// Entries pushed after the snapshot that produced `through` survive,
    /// including replacements of acknowledged entries. Returns the number of
    /// entries left.
    pub async fn ack(&self, key: &str, through: u64) -> usize {
        let mut queues = self.queues.write().await;
        let Some(queue) = queues.get_mut(key) else {
            return 0;
        };
        queue.entries.retain(|(seq, _)| *seq > through);
        queue.entries.len()
    }
}

impl KeyValueStore for MemoryStorage {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// Visitor Identity
// =============================================================================

/// The visitor's analytics client id, minted and stored on first use.
///
/// A visitor whose cart snapshot predates the stored id adopts the cart's id,
/// so browser and cart events share one client.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn client_id(store: &impl KeyValueStore) -> Result<Uuid, StorageError> {
    if let Some(raw) = store.get_raw(CLIENT_ID_KEY).await? {
        match Uuid::parse_str(&raw) {
            Ok(id) => return Ok(id),
            Err(e) => tracing::warn!(error = %e, "Replacing unreadable client id"),
        }
    }

    let id = match store.get_raw(CART_STORAGE_KEY).await? {
        Some(raw) => PersistedState::<CartState>::decode(&raw, CART_STORAGE_VERSION)
            .map_or_else(|_| Uuid::new_v4(), |cart| cart.cart_id),
        None => Uuid::new_v4(),
    };
    store.set_raw(CLIENT_ID_KEY, id.to_string()).await?;
    Ok(id)
}

// =============================================================================
// Cart Snapshot
// =============================================================================

/// Load the cart snapshot, falling back to an empty cart owned by the
/// visitor's [`client_id`].
///
/// A snapshot written with a different layout version, or one that does not
/// parse, is discarded.
///
/// # Errors
///
/// Returns an error only if the store itself fails.
pub async fn load_cart(store: &impl KeyValueStore) -> Result<CartState, StorageError> {
    if let Some(raw) = store.get_raw(CART_STORAGE_KEY).await? {
        match PersistedState::<CartState>::decode(&raw, CART_STORAGE_VERSION) {
            Ok(cart) => return Ok(cart),
            Err(e) => tracing::warn!(error = %e, "Discarding stored cart snapshot"),
        }
    }
    Ok(CartState::with_id(client_id(store).await?))
}

/// Persist the cart snapshot.
///
/// # Errors
///
/// Returns an error if serialization or the store fails.
pub async fn save_cart(store: &impl KeyValueStore, cart: &CartState) -> Result<(), StorageError> {
    let raw = PersistedState::new(cart, CART_STORAGE_VERSION).encode()?;
    store.set_raw(CART_STORAGE_KEY, raw).await
}
