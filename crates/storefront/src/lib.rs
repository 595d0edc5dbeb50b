//! Panel Labels storefront library.
//!
//! The binary in `main.rs` is a thin wrapper around [`build_router`]; the
//! integration tests drive the same router through `tower::ServiceExt`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod offline;
pub mod routes;
pub mod seo;
pub mod services;
pub mod state;
pub mod storage;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{Router, routing::get};
use tower_http::services::ServeDir;

use crate::offline::cache_first_middleware;
use crate::state::AppState;

/// The application without the outer middleware stack.
///
/// This is the "network" the offline cache precaches from and falls through
/// to.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let static_dir = ServeDir::new(&state.config().static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        .layer(session_layer)
        .with_state(state)
}

/// Build the full router: install and activate the offline cache, then wrap
/// [`app`] in the cache layer and the request middleware stack.
pub async fn build_router(state: AppState) -> Router {
    let origin = app(state.clone());
    let cache = state.offline_cache().clone();
    cache.install(origin.clone()).await;
    cache.activate().await;

    origin
        .layer(from_fn_with_state(cache, cache_first_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(middleware::trace_layer())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Ready once the offline cache has been installed and activated.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.offline_cache().is_active() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
