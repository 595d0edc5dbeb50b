//! JSON API: analytics beacon and offline sync receivers.
//!
//! The sync receivers accept the payloads drained by
//! [`crate::offline::SyncManager`]. A non-2xx answer leaves the sender's
//! queue intact so it retries on the next tick.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use panel_labels_core::offline::{AnalyticsSyncPayload, CartSyncPayload};
use serde::Deserialize;
use serde_json::{Map, Value};
use tower_sessions::Session;
use tracing::instrument;

use crate::catalog;
use crate::error::{AppError, Result};
use crate::services::AnalyticsEvent;
use crate::state::AppState;
use crate::storage::{self, SessionStorage};

/// Longest accepted beacon client id.
const MAX_CLIENT_ID_LEN: usize = 64;

/// Body of `POST /api/analytics/event`.
#[derive(Debug, Deserialize)]
pub struct BeaconRequest {
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Record a browser analytics event.
///
/// Without a `client_id` the visitor's stored client id is used, which is
/// also the id of any cart they create. Answers
/// `202 Accepted`; dispatch happens in the background.
///
/// # Errors
///
/// Returns 400 for an event name outside the client allow-list or an
/// oversized client id.
#[instrument(skip(state, session, request), fields(event = %request.name))]
pub async fn analytics_event(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<BeaconRequest>,
) -> Result<StatusCode> {
    let client_id = match request.client_id.filter(|id| !id.trim().is_empty()) {
        Some(id) if id.len() > MAX_CLIENT_ID_LEN => {
            return Err(AppError::BadRequest("client_id too long".to_string()));
        }
        Some(id) => id,
        None => storage::client_id(&SessionStorage::new(session))
            .await?
            .to_string(),
    };

    let event = AnalyticsEvent::from_beacon(&client_id, &request.name, request.params)
        .ok_or_else(|| AppError::BadRequest(format!("unknown event {}", request.name)))?;
    state.analytics().track(event);

    Ok(StatusCode::ACCEPTED)
}

/// Receive drained cart snapshots.
///
/// Snapshots are acknowledged and logged; lines naming products outside the
/// catalog are counted separately.
#[instrument(skip(payload), fields(entries = payload.items.len()))]
pub async fn cart_sync(Json(payload): Json<CartSyncPayload>) -> StatusCode {
    let lines = payload.items.iter().flat_map(|entry| &entry.lines);
    let (known, unknown) = lines.fold((0_usize, 0_usize), |(known, unknown), line| {
        if catalog::by_id(line.product_id).is_some() {
            (known + 1, unknown)
        } else {
            (known, unknown + 1)
        }
    });

    if unknown > 0 {
        tracing::warn!(unknown, "Cart sync referenced unknown products");
    }
    tracing::info!(
        carts = payload.items.len(),
        lines = known,
        "Cart sync received"
    );
    StatusCode::NO_CONTENT
}

/// Receive drained analytics events.
///
/// With server-side GA4 configured the events are forwarded; a forwarding
/// failure answers `502` so the sender keeps its queue. Otherwise the events
/// are logged and acknowledged.
#[instrument(skip(state, payload), fields(events = payload.events.len()))]
pub async fn analytics_sync(
    State(state): State<AppState>,
    Json(payload): Json<AnalyticsSyncPayload>,
) -> Response {
    let events: Vec<AnalyticsEvent> = payload.events.into_iter().map(Into::into).collect();

    let Some(ga4) = state.ga4() else {
        tracing::info!(events = events.len(), "Analytics sync received");
        return StatusCode::NO_CONTENT.into_response();
    };

    match ga4.send(&events).await {
        Ok(()) => {
            tracing::info!(events = events.len(), "Analytics sync forwarded");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Analytics sync forwarding failed");
            (StatusCode::BAD_GATEWAY, "Forwarding failed").into_response()
        }
    }
}
