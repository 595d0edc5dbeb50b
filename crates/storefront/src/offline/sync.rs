//! Background sync of the offline queues.
//!
//! Cart snapshots and undeliverable analytics events are appended to
//! process-wide queues in [`MemoryStorage`]. Appending registers the queue's
//! [`SyncTag`]; a background task drains every registered tag on an interval
//! by posting the queue to its sync endpoint.
//!
//! Each cart keeps only its latest snapshot in the queue, and both queues are
//! capped. A 2xx response drops the entries that were sent and unregisters the
//! tag once the queue is empty. Any other outcome leaves the tag registered, so
//! the next tick retries. There is no backoff beyond the tick interval.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use panel_labels_core::offline::{AnalyticsSyncEntry, CartSyncEntry, SyncTag};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;
use url::Url;

use crate::config::OfflineConfig;
use crate::storage::MemoryStorage;

/// Most cart snapshots held at once (one per cart).
const MAX_QUEUED_CARTS: usize = 1_000;

/// Most undelivered analytics events held at once.
const MAX_QUEUED_EVENTS: usize = 500;

/// Errors draining a sync queue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{tag} rejected with status {status}")]
    Rejected { tag: SyncTag, status: u16 },
    #[error("invalid sync endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Owns the offline queues and the registered sync tags.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<SyncManagerInner>,
}

struct SyncManagerInner {
    storage: MemoryStorage,
    client: reqwest::Client,
    endpoint: Url,
    enabled: bool,
    interval: Duration,
    registered: Mutex<BTreeSet<SyncTag>>,
    /// Held while a queue changes together with its registration.
    queue_lock: tokio::sync::Mutex<()>,
}

impl SyncManager {
    #[must_use]
    pub fn new(config: &OfflineConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(SyncManagerInner {
                storage: MemoryStorage::new(),
                client,
                endpoint: config.sync_endpoint.clone(),
                enabled: config.sync_enabled,
                interval: config.sync_interval,
                registered: Mutex::new(BTreeSet::new()),
                queue_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Storage holding the queues.
    #[must_use]
    pub fn storage(&self) -> &MemoryStorage {
        &self.inner.storage
    }

    /// Queue a cart snapshot, replacing any queued snapshot of the same cart,
    /// and register `cart-sync`.
    pub async fn enqueue_cart(&self, entry: CartSyncEntry) {
        let cart_id = Value::String(entry.cart_id.to_string());
        self.enqueue(
            SyncTag::CartSync,
            &entry,
            move |queued| queued.get("cart_id") == Some(&cart_id),
            MAX_QUEUED_CARTS,
        )
        .await;
    }

    /// Queue an undelivered analytics event and register `analytics-sync`.
    pub async fn enqueue_analytics(&self, entry: AnalyticsSyncEntry) {
        self.enqueue(SyncTag::AnalyticsSync, &entry, |_| false, MAX_QUEUED_EVENTS)
            .await;
    }

    async fn enqueue<T: Serialize + Sync>(
        &self,
        tag: SyncTag,
        entry: &T,
        supersedes: impl Fn(&Value) -> bool + Send,
        limit: usize,
    ) {
        if !self.inner.enabled {
            return;
        }
        let _guard = self.inner.queue_lock.lock().await;
        let pushed = self
            .inner
            .storage
            .push_entry(tag.queue_key(), entry, supersedes, limit)
            .await;
        match pushed {
            Ok(len) => {
                tracing::debug!(%tag, queued = len, "Queued offline entry");
                self.register(tag);
            }
            Err(e) => tracing::warn!(%tag, error = %e, "Failed to queue offline entry"),
        }
    }

    /// Mark a tag as needing sync.
    pub fn register(&self, tag: SyncTag) {
        if let Ok(mut registered) = self.inner.registered.lock() {
            registered.insert(tag);
        }
    }

    fn unregister(&self, tag: SyncTag) {
        if let Ok(mut registered) = self.inner.registered.lock() {
            registered.remove(&tag);
        }
    }

    /// Tags currently awaiting sync, in a stable order.
    #[must_use]
    pub fn registered_tags(&self) -> Vec<SyncTag> {
        self.inner
            .registered
            .lock()
            .map(|registered| registered.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain one queue now.
    ///
    /// Returns the number of entries delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or answers with a
    /// non-2xx status. The queue is left untouched in that case.
    #[instrument(skip(self), fields(tag = %tag))]
    pub async fn sync_now(&self, tag: SyncTag) -> Result<usize, SyncError> {
        let storage = &self.inner.storage;
        let snapshot = storage.snapshot(tag.queue_key()).await;
        let Some(through) = snapshot.through else {
            let _guard = self.inner.queue_lock.lock().await;
            if storage.queue_len(tag.queue_key()).await == 0 {
                self.unregister(tag);
            }
            return Ok(0);
        };
        let count = snapshot.entries.len();

        let mut body = serde_json::Map::new();
        body.insert(
            tag.payload_field().to_string(),
            Value::Array(snapshot.entries),
        );

        let url = self.inner.endpoint.join(tag.endpoint_path())?;
        let response = self.inner.client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Rejected {
                tag,
                status: status.as_u16(),
            });
        }

        let guard = self.inner.queue_lock.lock().await;
        let remaining = storage.ack(tag.queue_key(), through).await;
        if remaining == 0 {
            self.unregister(tag);
        }
        drop(guard);

        tracing::info!(delivered = count, "Offline queue synced");
        Ok(count)
    }

    /// Drain every registered tag once, logging failures.
    pub async fn sync_registered(&self) {
        for tag in self.registered_tags() {
            if let Err(e) = self.sync_now(tag).await {
                tracing::warn!(%tag, error = %e, "Background sync failed, will retry");
            }
        }
    }

    /// Spawn the interval loop that drains registered tags.
    ///
    /// Returns `None` when sync is disabled.
    #[must_use]
    pub fn spawn(&self) -> Option<JoinHandle<()>> {
        if !self.inner.enabled {
            tracing::info!("Background sync disabled");
            return None;
        }

        let manager = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.sync_registered().await;
            }
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use panel_labels_core::CartState;

    use super::*;

    fn manager(enabled: bool) -> SyncManager {
        let mut config = OfflineConfig::with_defaults("http://127.0.0.1:9").unwrap();
        config.sync_enabled = enabled;
        SyncManager::new(&config, reqwest::Client::new())
    }

    fn cart_entry() -> CartSyncEntry {
        CartSyncEntry::snapshot(&CartState::new(), DateTime::<Utc>::UNIX_EPOCH)
    }

    fn event(name: &str) -> AnalyticsSyncEntry {
        AnalyticsSyncEntry {
            name: name.to_string(),
            client_id: "c1".to_string(),
            params: serde_json::Map::new(),
            occurred_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn test_enqueue_registers_tag() {
        let sync = manager(true);
        sync.enqueue_cart(cart_entry()).await;
        sync.enqueue_cart(cart_entry()).await;

        assert_eq!(sync.registered_tags(), vec![SyncTag::CartSync]);
        let queued: Vec<CartSyncEntry> = sync.storage().entries("offline_cart").await;
        assert_eq!(queued.len(), 2);
    }

    #[tokio::test]
    async fn test_cart_snapshots_replace_per_cart() {
        let sync = manager(true);
        let mut cart = CartState::new();
        for quantity in 1..=5 {
            cart.items.clear();
            cart.add(
                panel_labels_core::CartProduct {
                    id: panel_labels_core::ProductId::new(1),
                    slug: "kit".to_string(),
                    name: "Kit".to_string(),
                    price: panel_labels_core::Price::usd_cents(1_000),
                    image: None,
                },
                quantity,
            );
            sync.enqueue_cart(CartSyncEntry::snapshot(&cart, Utc::now())).await;
        }

        let queued: Vec<CartSyncEntry> = sync.storage().entries("offline_cart").await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_analytics_queue_is_capped() {
        let sync = manager(true);
        for n in 0..MAX_QUEUED_EVENTS + 10 {
            sync.enqueue_analytics(event(&format!("e{n}"))).await;
        }
        let queued: Vec<AnalyticsSyncEntry> = sync.storage().entries("offline_analytics").await;
        assert_eq!(queued.len(), MAX_QUEUED_EVENTS);
        assert_eq!(queued[0].name, "e10");
    }

    #[tokio::test]
    async fn test_disabled_manager_queues_nothing() {
        let sync = manager(false);
        sync.enqueue_cart(cart_entry()).await;
        assert!(sync.registered_tags().is_empty());
        assert!(
            sync.storage()
                .entries::<CartSyncEntry>("offline_cart")
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_empty_queue_unregisters() {
        let sync = manager(true);
        sync.register(SyncTag::AnalyticsSync);
        assert_eq!(sync.sync_now(SyncTag::AnalyticsSync).await.unwrap(), 0);
        assert!(sync.registered_tags().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_keeps_queue() {
        let sync = manager(true);
        sync.enqueue_cart(cart_entry()).await;

        assert!(sync.sync_now(SyncTag::CartSync).await.is_err());
        assert_eq!(sync.registered_tags(), vec![SyncTag::CartSync]);
        let queued: Vec<CartSyncEntry> = sync.storage().entries("offline_cart").await;
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_queued_during_sync_stays_registered() {
        use axum::extract::State;
        use axum::http::StatusCode;
        use axum::routing::post;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let config = OfflineConfig::with_defaults(&base_url).unwrap();
        let sync = SyncManager::new(&config, reqwest::Client::new());

        // The receiver answers while another cart changes
        let receiver = axum::Router::new()
            .route(
                "/api/cart/sync",
                post(|State(sync): State<SyncManager>| async move {
                    sync.enqueue_cart(cart_entry()).await;
                    StatusCode::NO_CONTENT
                }),
            )
            .with_state(sync.clone());
        tokio::spawn(async move {
            axum::serve(listener, receiver).await.unwrap();
        });

        sync.enqueue_cart(cart_entry()).await;
        assert_eq!(sync.sync_now(SyncTag::CartSync).await.unwrap(), 1);
        assert_eq!(sync.registered_tags(), vec![SyncTag::CartSync]);
        assert_eq!(sync.storage().queue_len("offline_cart").await, 1);
    }
}
