//! Offline queue entries and background-sync payloads.
//!
//! Queues hold plain JSON entries with no schema versioning. A cart has at
//! most one queued snapshot (the latest write wins) and a successful sync
//! removes exactly the entries it delivered.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartState;
use crate::types::ProductId;

/// Storage key for queued cart snapshots.
pub const OFFLINE_CART_KEY: &str = "offline_cart";

/// Storage key for queued analytics events.
pub const OFFLINE_ANALYTICS_KEY: &str = "offline_analytics";

/// A named background-sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncTag {
    /// Drains `offline_cart` to `/api/cart/sync`.
    CartSync,
    /// Drains `offline_analytics` to `/api/analytics/sync`.
    AnalyticsSync,
}

impl SyncTag {
    pub const ALL: [Self; 2] = [Self::CartSync, Self::AnalyticsSync];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CartSync => "cart-sync",
            Self::AnalyticsSync => "analytics-sync",
        }
    }

    /// Storage key of the queue this tag drains.
    #[must_use]
    pub const fn queue_key(&self) -> &'static str {
        match self {
            Self::CartSync => OFFLINE_CART_KEY,
            Self::AnalyticsSync => OFFLINE_ANALYTICS_KEY,
        }
    }

    /// Path of the endpoint the queue is posted to.
    #[must_use]
    pub const fn endpoint_path(&self) -> &'static str {
        match self {
            Self::CartSync => "/api/cart/sync",
            Self::AnalyticsSync => "/api/analytics/sync",
        }
    }

    /// Name of the JSON array field in the sync request body.
    #[must_use]
    pub const fn payload_field(&self) -> &'static str {
        match self {
            Self::CartSync => "items",
            Self::AnalyticsSync => "events",
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a queued cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Queued cart snapshot, written after each cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSyncEntry {
    pub cart_id: Uuid,
    pub lines: Vec<SyncedCartLine>,
    pub updated_at: DateTime<Utc>,
}

impl CartSyncEntry {
    /// Capture the current lines of a cart.
    #[must_use]
    pub fn snapshot(cart: &CartState, updated_at: DateTime<Utc>) -> Self {
        Self {
            cart_id: cart.cart_id,
            lines: cart
                .items
                .iter()
                .map(|item| SyncedCartLine {
                    product_id: item.product.id,
                    quantity: item.quantity,
                })
                .collect(),
            updated_at,
        }
    }
}

/// Queued analytics event that could not be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSyncEntry {
    pub name: String,
    pub client_id: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

/// Body of `POST /api/cart/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSyncPayload {
    pub items: Vec<CartSyncEntry>,
}

/// Body of `POST /api/analytics/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSyncPayload {
    pub events: Vec<AnalyticsSyncEntry>,
}
