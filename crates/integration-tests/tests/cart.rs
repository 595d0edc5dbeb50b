//! Integration tests for the cart store and checkout hand-off.
//!
//! Each visitor is a `reqwest::Client` with its own cookie jar, so the cart
//! follows the session cookie exactly as in a browser.

#![allow(clippy::unwrap_used)]

use panel_labels_integration_tests::TestServer;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

async fn add(server: &TestServer, client: &Client, product_id: u32, quantity: u32) -> reqwest::Response {
    client
        .post(server.url("/cart/add"))
        .form(&[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ])
        .send()
        .await
        .unwrap()
}

async fn summary(server: &TestServer, client: &Client) -> Value {
    client
        .get(server.url("/cart/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_updates_badge_and_totals() {
    let server = TestServer::start().await.unwrap();

    let resp = add(&server, &server.client, 2, 2).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["hx-trigger"], "cart-updated");
    assert!(resp.text().await.unwrap().contains("<span class=\"cart-badge\">2</span>"));

    let cart = summary(&server, &server.client).await;
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["subtotal"], "58.00");
    assert_eq!(cart["tax"], "4.64");
    assert_eq!(cart["shipping"], "0.00");
    assert_eq!(cart["total"], "62.64");
    assert_eq!(cart["currency"], "USD");
    assert_eq!(cart["items"][0]["slug"], "residential-40-circuit-kit");
}

#[tokio::test]
async fn test_small_cart_pays_shipping() {
    let server = TestServer::start().await.unwrap();
    add(&server, &server.client, 3, 1).await;

    let cart = summary(&server, &server.client).await;
    assert_eq!(cart["subtotal"], "14.99");
    assert_eq!(cart["shipping"], "9.99");

    let body = server
        .client
        .get(server.url("/cart"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Add $35.01 more for free shipping."));
    assert!(body.contains("noindex, nofollow"));
}

#[tokio::test]
async fn test_carts_are_per_visitor() {
    let server = TestServer::start().await.unwrap();
    add(&server, &server.client, 1, 1).await;

    let other = server.new_visitor().unwrap();
    let cart = summary(&server, &other).await;
    assert_eq!(cart["item_count"], 0);

    let badge = other
        .get(server.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!badge.contains("cart-badge"));
}

#[tokio::test]
async fn test_add_rejects_unknown_and_unavailable_products() {
    let server = TestServer::start().await.unwrap();

    let resp = add(&server, &server.client, 99, 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("data-cart-error"));

    let resp = add(&server, &server.client, 6, 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.text().await.unwrap().contains("out of stock"));

    add(&server, &server.client, 3, 5).await;
    let resp = add(&server, &server.client, 3, 4).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.text().await.unwrap().contains("Only 8 of"));

    let cart = summary(&server, &server.client).await;
    assert_eq!(cart["item_count"], 5);
}

#[tokio::test]
async fn test_malformed_cart_forms_answer_inline_errors() {
    let server = TestServer::start().await.unwrap();
    add(&server, &server.client, 1, 1).await;

    for (path, form) in [
        ("/cart/add", [("product_id", "1"), ("quantity", "-1")]),
        ("/cart/add", [("product_id", "1"), ("quantity", "0")]),
        ("/cart/add", [("product_id", "abc"), ("quantity", "1")]),
        ("/cart/update", [("product_id", "1"), ("quantity", "abc")]),
        ("/cart/update", [("product_id", ""), ("quantity", "2")]),
    ] {
        let resp = server.client.post(server.url(path)).form(&form).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path} {form:?}");
        assert!(!resp.headers().contains_key("hx-trigger"));
        assert!(resp.text().await.unwrap().contains("data-cart-error"));
    }

    let resp = server
        .client
        .post(server.url("/cart/remove"))
        .form(&[("quantity", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.text().await.unwrap().contains("data-cart-error"));

    // A blank quantity still adds one
    let resp = server
        .client
        .post(server.url("/cart/add"))
        .form(&[("product_id", "1"), ("quantity", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(summary(&server, &server.client).await["item_count"], 2);
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let server = TestServer::start().await.unwrap();
    add(&server, &server.client, 1, 1).await;
    add(&server, &server.client, 4, 1).await;

    let resp = server
        .client
        .post(server.url("/cart/update"))
        .form(&[("product_id", "1"), ("quantity", "3")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["hx-trigger"], "cart-updated");
    assert!(resp.text().await.unwrap().contains("id=\"cart-items\""));
    assert_eq!(summary(&server, &server.client).await["item_count"], 4);

    let resp = server
        .client
        .post(server.url("/cart/update"))
        .form(&[("product_id", "1"), ("quantity", "1000")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/cart/update"))
        .form(&[("product_id", "1"), ("quantity", "0")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(summary(&server, &server.client).await["item_count"], 1);

    server
        .client
        .post(server.url("/cart/remove"))
        .form(&[("product_id", "4")])
        .send()
        .await
        .unwrap();
    assert_eq!(summary(&server, &server.client).await["item_count"], 0);

    // Clearing an empty cart changes nothing and fires no trigger
    let resp = server.client.post(server.url("/cart/clear")).send().await.unwrap();
    assert!(!resp.headers().contains_key("hx-trigger"));
    assert!(resp.text().await.unwrap().contains("Your cart is empty."));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_with_empty_cart_redirects_to_cart() {
    let server = TestServer::start().await.unwrap();

    let resp = server.client.get(server.url("/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/cart");
}

#[tokio::test]
async fn test_checkout_summary_without_provider() {
    let server = TestServer::start().await.unwrap();
    add(&server, &server.client, 2, 2).await;

    let resp = server.client.get(server.url("/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Order Summary"));
    assert!(body.contains("$62.64"));
}

#[tokio::test]
async fn test_checkout_hands_off_to_provider() {
    let server = TestServer::start_with(|config| {
        config.checkout_url = Some(Url::parse("https://pay.example.test/start?shop=pl").unwrap());
    })
    .await
    .unwrap();
    add(&server, &server.client, 2, 2).await;
    add(&server, &server.client, 3, 1).await;

    let resp = server.client.get(server.url("/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let location = Url::parse(resp.headers()["location"].to_str().unwrap()).unwrap();
    assert_eq!(location.host_str(), Some("pay.example.test"));
    let pairs: Vec<(String, String)> = location.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("shop".to_string(), "pl".to_string()),
            (
                "items".to_string(),
                "residential-40-circuit-kit:2,subpanel-12-circuit-kit:1".to_string()
            ),
        ]
    );
}
