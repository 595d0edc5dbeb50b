//! Integration tests for lead capture, the analytics beacon, and the sync
//! receivers.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use panel_labels_core::offline::{AnalyticsSyncEntry, SyncTag};
use panel_labels_integration_tests::{Collector, TestServer};
use reqwest::StatusCode;
use serde_json::{Value, json};

// =============================================================================
// Newsletter
// =============================================================================

#[tokio::test]
async fn test_newsletter_accepts_valid_email() {
    let server = TestServer::start().await.unwrap();

    let resp = server
        .client
        .post(server.url("/newsletter/subscribe"))
        .form(&[("email", "  Sparky@Example.COM "), ("source", "home-hero")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("sparky@example.com"));
    assert!(body.contains("is on the list"));
}

#[tokio::test]
async fn test_newsletter_rejects_invalid_email() {
    let server = TestServer::start().await.unwrap();

    let resp = server
        .client
        .post(server.url("/newsletter/subscribe"))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Please enter a valid email address."));
    assert!(body.contains("value=\"not-an-email\""));
    assert!(body.contains("value=\"footer\""));
}

#[tokio::test]
async fn test_newsletter_is_rate_limited() {
    let server = TestServer::start().await.unwrap();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let resp = server
            .client
            .post(server.url("/newsletter/subscribe"))
            .form(&[("email", "burst@example.com")])
            .send()
            .await
            .unwrap();
        statuses.push(resp.status());
    }
    assert_eq!(statuses[0], StatusCode::OK);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

// =============================================================================
// Analytics beacon
// =============================================================================

#[tokio::test]
async fn test_analytics_beacon() {
    let server = TestServer::start().await.unwrap();
    let url = server.url("/api/analytics/event");

    let resp = server
        .client
        .post(&url)
        .json(&json!({"name": "page_view", "params": {"page_location": "/"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = server
        .client
        .post(&url)
        .json(&json!({"name": "purchase"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(&url)
        .json(&json!({"name": "page_view", "client_id": "x".repeat(65)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_visitor_events_share_one_client_id() {
    let collector = Collector::start(204).await.unwrap();
    let server = TestServer::start_with(|config| collector.configure(config))
        .await
        .unwrap();
    let visitor = server.new_visitor().unwrap();
    let url = server.url("/api/analytics/event");

    for name in ["page_view", "view_item"] {
        let resp = visitor
            .post(&url)
            .json(&json!({"name": name, "params": {"currency": "USD", "value": 29.0}}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
    visitor
        .post(server.url("/cart/add"))
        .form(&[("product_id", "2")])
        .send()
        .await
        .unwrap();

    let cart: Value = visitor
        .get(server.url("/cart/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cart_id = cart["cart_id"].as_str().unwrap();

    let events = collector.wait_for_events(3).await;
    let mut names: Vec<&str> = events.iter().map(|(_, name)| name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["add_to_cart", "page_view", "view_item"]);
    assert!(events.iter().all(|(client_id, _)| client_id == cart_id));
}

// =============================================================================
// Sync receivers
// =============================================================================

#[tokio::test]
async fn test_cart_sync_receiver() {
    let server = TestServer::start().await.unwrap();

    let resp = server
        .client
        .post(server.url("/api/cart/sync"))
        .json(&json!({
            "items": [{
                "cart_id": uuid::Uuid::new_v4(),
                "lines": [
                    {"product_id": 1, "quantity": 2},
                    {"product_id": 404, "quantity": 1}
                ],
                "updated_at": "2026-10-01T12:00:00Z"
            }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server
        .client
        .post(server.url("/api/cart/sync"))
        .json(&json!({"carts": []}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_analytics_sync_receiver_without_ga4() {
    let server = TestServer::start().await.unwrap();

    let resp = server
        .client
        .post(server.url("/api/analytics/sync"))
        .json(&json!({
            "events": [{
                "name": "add_to_cart",
                "client_id": "abc",
                "params": {"value": "29.00"},
                "occurred_at": "2026-10-01T12:00:00Z"
            }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_analytics_sync_receiver_forwards_to_ga4() {
    let collector = Collector::start(204).await.unwrap();
    let server = TestServer::start_with(|config| collector.configure(config))
        .await
        .unwrap();
    let body = json!({
        "events": [
            {"name": "add_to_cart", "client_id": "abc", "occurred_at": "2026-10-01T12:00:00Z"},
            {"name": "generate_lead", "client_id": "def", "occurred_at": "2026-10-01T12:01:00Z"}
        ]
    });

    let resp = server
        .client
        .post(server.url("/api/analytics/sync"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        collector.events(),
        [
            ("abc".to_string(), "add_to_cart".to_string()),
            ("def".to_string(), "generate_lead".to_string()),
        ]
    );

    collector.set_status(500);
    let resp = server
        .client
        .post(server.url("/api/analytics/sync"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_failed_forwarding_keeps_sender_queue() {
    let collector = Collector::start(500).await.unwrap();
    let server = TestServer::start_with(|config| collector.configure(config))
        .await
        .unwrap();
    let sync = server.state.sync();

    sync.enqueue_analytics(AnalyticsSyncEntry {
        name: "generate_lead".to_string(),
        client_id: "c1".to_string(),
        params: serde_json::Map::new(),
        occurred_at: Utc::now(),
    })
    .await;

    assert!(sync.sync_now(SyncTag::AnalyticsSync).await.is_err());
    assert_eq!(sync.storage().queue_len("offline_analytics").await, 1);
    assert_eq!(sync.registered_tags(), [SyncTag::AnalyticsSync]);

    collector.set_status(204);
    assert_eq!(sync.sync_now(SyncTag::AnalyticsSync).await.unwrap(), 1);
    assert_eq!(sync.storage().queue_len("offline_analytics").await, 0);
    assert!(sync.registered_tags().is_empty());
    assert_eq!(
        collector.events().last().unwrap(),
        &("c1".to_string(), "generate_lead".to_string())
    );
}
