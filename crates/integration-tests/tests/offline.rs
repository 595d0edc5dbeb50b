//! Integration tests for the offline cache and background sync.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use panel_labels_core::offline::{AnalyticsSyncEntry, SyncTag};
use panel_labels_integration_tests::{Collector, TestServer};
use reqwest::StatusCode;
use url::Url;

// =============================================================================
// Offline cache
// =============================================================================

#[tokio::test]
async fn test_cache_is_active_after_startup() {
    let server = TestServer::start().await.unwrap();
    let cache = server.state.offline_cache();

    assert!(cache.is_active());
    assert_eq!(cache.cache_names().await, vec![cache.name().to_string()]);
    assert!(cache.lookup("/offline").await.is_some());
    assert!(cache.lookup("/static/css/main.css").await.is_some());
}

#[tokio::test]
async fn test_precached_page_is_a_hit() {
    let server = TestServer::start().await.unwrap();

    let resp = server.client.get(server.url("/products")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-cache"], "hit");
    // Outer middleware still runs on cached responses
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_miss_then_hit() {
    let server = TestServer::start().await.unwrap();
    let url = server.url("/products?category=custom");

    let first = server.client.get(&url).send().await.unwrap();
    assert_eq!(first.headers()["x-cache"], "miss");
    let first_body = first.text().await.unwrap();

    let second = server.client.get(&url).send().await.unwrap();
    assert_eq!(second.headers()["x-cache"], "hit");
    assert_eq!(second.text().await.unwrap(), first_body);
}

#[tokio::test]
async fn test_cached_product_page_leaves_view_item_to_browser() {
    let collector = Collector::start(204).await.unwrap();
    let server = TestServer::start_with(|config| collector.configure(config))
        .await
        .unwrap();
    let url = server.url("/products/subpanel-12-circuit-kit");

    let first = server.client.get(&url).send().await.unwrap();
    assert!(!first.headers().contains_key("set-cookie"));
    let body = first.text().await.unwrap();
    assert!(body.contains("data-view-item"));
    assert!(body.contains("data-price=\"14.99\""));
    assert!(body.contains("data-currency=\"USD\""));

    let second = server.new_visitor().unwrap().get(&url).send().await.unwrap();
    assert_eq!(second.headers()["x-cache"], "hit");
    assert!(!second.headers().contains_key("set-cookie"));
    assert!(second.text().await.unwrap().contains("data-view-item"));

    // Rendering reports nothing; the browser beacon does
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(collector.events().is_empty());

    let resp = server
        .client
        .post(server.url("/api/analytics/event"))
        .json(&serde_json::json!({
            "name": "view_item",
            "params": {"currency": "USD", "value": 14.99, "items": [{"item_id": "1"}]}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let events = collector.wait_for_events(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, "view_item");
}

#[tokio::test]
async fn test_bypassed_and_failed_responses_are_not_cached() {
    let server = TestServer::start().await.unwrap();

    let resp = server.client.get(server.url("/cart")).send().await.unwrap();
    assert!(!resp.headers().contains_key("x-cache"));

    let resp = server.client.get(server.url("/products/nope")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(server.state.offline_cache().lookup("/products/nope").await.is_none());
}

// =============================================================================
// Background sync
// =============================================================================

#[tokio::test]
async fn test_cart_changes_are_synced() {
    let server = TestServer::start().await.unwrap();
    let sync = server.state.sync();

    server
        .client
        .post(server.url("/cart/add"))
        .form(&[("product_id", "1"), ("quantity", "2")])
        .send()
        .await
        .unwrap();
    assert!(sync.registered_tags().contains(&SyncTag::CartSync));

    let delivered = sync.sync_now(SyncTag::CartSync).await.unwrap();
    assert_eq!(delivered, 1);
    assert!(!sync.registered_tags().contains(&SyncTag::CartSync));

    // A drained queue reports nothing to deliver
    assert_eq!(sync.sync_now(SyncTag::CartSync).await.unwrap(), 0);
}

#[tokio::test]
async fn test_analytics_queue_is_synced() {
    let server = TestServer::start().await.unwrap();
    let sync = server.state.sync();

    for name in ["add_to_cart", "begin_checkout"] {
        sync.enqueue_analytics(AnalyticsSyncEntry {
            name: name.to_string(),
            client_id: "visitor-1".to_string(),
            params: serde_json::Map::new(),
            occurred_at: Utc::now(),
        })
        .await;
    }

    sync.sync_registered().await;
    assert!(sync.registered_tags().is_empty());
    assert_eq!(sync.sync_now(SyncTag::AnalyticsSync).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_sync_keeps_queue() {
    // Nothing listens on the discard port
    let server = TestServer::start_with(|config| {
        config.offline.sync_endpoint = Url::parse("http://127.0.0.1:9/").unwrap();
    })
    .await
    .unwrap();
    let sync = server.state.sync();

    server
        .client
        .post(server.url("/cart/add"))
        .form(&[("product_id", "2")])
        .send()
        .await
        .unwrap();

    assert!(sync.sync_now(SyncTag::CartSync).await.is_err());
    assert!(sync.registered_tags().contains(&SyncTag::CartSync));
    let queued: Vec<serde_json::Value> = sync.storage().entries(SyncTag::CartSync.queue_key()).await;
    assert_eq!(queued.len(), 1);
}

#[tokio::test]
async fn test_disabled_sync_queues_nothing() {
    let server = TestServer::start_with(|config| config.offline.sync_enabled = false)
        .await
        .unwrap();
    let sync = server.state.sync();

    server
        .client
        .post(server.url("/cart/add"))
        .form(&[("product_id", "1")])
        .send()
        .await
        .unwrap();

    assert!(sync.registered_tags().is_empty());
    assert!(sync.spawn().is_none());
}
