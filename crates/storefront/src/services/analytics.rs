//! Server-side analytics events and dispatch.
//!
//! Handlers call [`AnalyticsTracker::track`], which never blocks and never
//! fails. A background task delivers events to the GA4 Measurement Protocol
//! when `GA4_API_SECRET` is configured and logs them otherwise. Events that
//! cannot be delivered are queued for `analytics-sync`.
//!
//! Client-side tags (gtag, Meta pixel) are rendered by the templates and fed
//! by `/static/js/analytics.js`; browser-only events such as `page_view` and
//! `view_item` reach this module through the `/api/analytics/event` beacon.

use std::fmt;

use chrono::{DateTime, Utc};
use panel_labels_core::offline::AnalyticsSyncEntry;
use panel_labels_core::{CartEvent, CartItem, CartProduct, CartState, Price};
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::AnalyticsConfig;
use crate::offline::SyncManager;

/// GA4 Measurement Protocol collection endpoint.
pub const GA4_COLLECT_URL: &str = "https://www.google-analytics.com/mp/collect";

/// GA4 accepts at most 25 events per request.
const GA4_MAX_EVENTS_PER_REQUEST: usize = 25;

/// Events the browser beacon may report.
pub const CLIENT_EVENT_NAMES: &[&str] = &[
    "page_view",
    "view_item",
    "view_item_list",
    "select_item",
    "begin_checkout",
];

/// Errors delivering analytics events.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("collector rejected events with status {0}")]
    Rejected(u16),
}

// =============================================================================
// Events
// =============================================================================

/// A named analytics event with GA4-style parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub client_id: String,
    pub params: Map<String, Value>,
    pub occurred_at: DateTime<Utc>,
}

impl fmt::Display for AnalyticsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            params: Map::new(),
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Translate a cart mutation into its ecommerce event.
    #[must_use]
    pub fn from_cart_event(client_id: &str, event: &CartEvent) -> Self {
        match event {
            CartEvent::Added { product, quantity } => {
                ecommerce("add_to_cart", client_id, product.price * *quantity)
                    .param("items", json!([item_json(product, *quantity)]))
            }
            CartEvent::Removed { product, quantity } => {
                ecommerce("remove_from_cart", client_id, product.price * *quantity)
                    .param("items", json!([item_json(product, *quantity)]))
            }
            CartEvent::QuantityUpdated { product, from, to } => {
                ecommerce("update_cart_quantity", client_id, product.price * *to)
                    .param("items", json!([item_json(product, *to)]))
                    .param("previous_quantity", *from)
            }
            CartEvent::Cleared { item_count } => {
                Self::new("clear_cart", client_id).param("item_count", *item_count)
            }
        }
    }

    /// `begin_checkout` for the current cart contents.
    #[must_use]
    pub fn begin_checkout(cart: &CartState) -> Self {
        let items: Vec<Value> = cart.items.iter().map(cart_item_json).collect();
        ecommerce(
            "begin_checkout",
            &cart.cart_id.to_string(),
            cart.totals().total,
        )
        .param("items", items)
    }

    /// `generate_lead` for an email capture.
    #[must_use]
    pub fn generate_lead(client_id: &str, source: &str) -> Self {
        Self::new("generate_lead", client_id).param("lead_source", source)
    }

    /// An event reported by the browser beacon.
    ///
    /// Returns `None` for names outside [`CLIENT_EVENT_NAMES`].
    #[must_use]
    pub fn from_beacon(client_id: &str, name: &str, params: Map<String, Value>) -> Option<Self> {
        CLIENT_EVENT_NAMES.contains(&name).then(|| Self {
            params,
            ..Self::new(name, client_id)
        })
    }
}

impl From<AnalyticsEvent> for AnalyticsSyncEntry {
    fn from(event: AnalyticsEvent) -> Self {
        Self {
            name: event.name,
            client_id: event.client_id,
            params: event.params,
            occurred_at: event.occurred_at,
        }
    }
}

impl From<AnalyticsSyncEntry> for AnalyticsEvent {
    fn from(entry: AnalyticsSyncEntry) -> Self {
        Self {
            name: entry.name,
            client_id: entry.client_id,
            params: entry.params,
            occurred_at: entry.occurred_at,
        }
    }
}

fn ecommerce(name: &str, client_id: &str, value: Price) -> AnalyticsEvent {
    AnalyticsEvent::new(name, client_id)
        .param("currency", value.currency_code.code())
        .param("value", price_value(value))
}

fn price_value(price: Price) -> Value {
    json!(price.amount.to_f64().unwrap_or_default())
}

fn item_json(product: &CartProduct, quantity: u32) -> Value {
    json!({
        "item_id": product.id.to_string(),
        "item_name": product.name,
        "price": price_value(product.price),
        "quantity": quantity,
    })
}

fn cart_item_json(item: &CartItem) -> Value {
    item_json(&item.product, item.quantity)
}

// =============================================================================
// GA4 Measurement Protocol
// =============================================================================

/// Minimal GA4 Measurement Protocol client.
#[derive(Clone)]
pub struct Ga4Client {
    client: reqwest::Client,
    endpoint: String,
    measurement_id: String,
    api_secret: SecretString,
}

impl Ga4Client {
    /// Build a client when both the measurement id and API secret are set.
    ///
    /// Posts to `ga4_collect_url` when configured, else [`GA4_COLLECT_URL`].
    #[must_use]
    pub fn from_config(config: &AnalyticsConfig, client: reqwest::Client) -> Option<Self> {
        let measurement_id = config.ga4_measurement_id.clone()?;
        let api_secret = config.ga4_api_secret.clone()?;
        Some(Self {
            client,
            endpoint: config
                .ga4_collect_url
                .clone()
                .unwrap_or_else(|| GA4_COLLECT_URL.to_string()),
            measurement_id,
            api_secret,
        })
    }

    /// Send events, grouped per client id and chunked to the GA4 limit.
    ///
    /// # Errors
    ///
    /// Returns an error on the first request that fails.
    pub async fn send(&self, events: &[AnalyticsEvent]) -> Result<(), AnalyticsError> {
        let mut groups: Vec<(&str, Vec<&AnalyticsEvent>)> = Vec::new();
        for event in events {
            match groups.iter_mut().find(|(id, _)| *id == event.client_id) {
                Some((_, group)) => group.push(event),
                None => groups.push((event.client_id.as_str(), vec![event])),
            }
        }

        for (client_id, group) in groups {
            for chunk in group.chunks(GA4_MAX_EVENTS_PER_REQUEST) {
                let body = json!({
                    "client_id": client_id,
                    "events": chunk
                        .iter()
                        .map(|e| json!({ "name": e.name, "params": e.params }))
                        .collect::<Vec<_>>(),
                });

                let response = self
                    .client
                    .post(&self.endpoint)
                    .query(&[
                        ("measurement_id", self.measurement_id.as_str()),
                        ("api_secret", self.api_secret.expose_secret()),
                    ])
                    .json(&body)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(AnalyticsError::Rejected(status.as_u16()));
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Non-blocking handle for recording analytics events.
#[derive(Clone)]
pub struct AnalyticsTracker {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl AnalyticsTracker {
    /// Spawn the dispatcher task and return a handle to it.
    ///
    /// With `ga4` set, events are posted to the Measurement Protocol;
    /// otherwise they are logged at DEBUG.
    #[must_use]
    pub fn spawn(ga4: Option<Ga4Client>, sync: SyncManager) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AnalyticsEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(ga4) = &ga4 else {
                    tracing::debug!(
                        event = %event,
                        client_id = %event.client_id,
                        params = %serde_json::Value::Object(event.params.clone()),
                        "Analytics event"
                    );
                    continue;
                };

                if let Err(e) = ga4.send(std::slice::from_ref(&event)).await {
                    tracing::warn!(event = %event, error = %e, "Analytics dispatch failed, queueing");
                    sync.enqueue_analytics(event.into()).await;
                }
            }
        });

        Self { tx }
    }

    /// Record an event. Never blocks; a closed dispatcher drops the event.
    pub fn track(&self, event: AnalyticsEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(event = %e.0, "Analytics dispatcher closed, dropping event");
        }
    }
}
