//! Integration tests for sitemap, robots, and the web app manifest.

#![allow(clippy::unwrap_used)]

use panel_labels_integration_tests::TestServer;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_sitemap() {
    let server = TestServer::start().await.unwrap();

    let resp = server.client.get(server.url("/sitemap.xml")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/xml")
    );

    let xml = resp.text().await.unwrap();
    let loc = |path: &str| format!("<loc>{}</loc>", server.url(path));
    assert!(xml.contains(&loc("/")));
    assert!(xml.contains(&loc("/products/residential-20-circuit-kit")));
    assert!(xml.contains(&loc("/products?category=bulk")));
    assert!(xml.contains(&loc("/faq")));
    assert!(xml.contains("<lastmod>2026-09-01</lastmod>"));
    assert!(!xml.contains(&loc("/cart")));
}

#[tokio::test]
async fn test_robots() {
    let server = TestServer::start().await.unwrap();

    let body = server
        .client
        .get(server.url("/robots.txt"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Disallow: /cart"));
    assert!(body.contains("Disallow: /checkout"));
    assert!(body.contains(&format!("Sitemap: {}", server.url("/sitemap.xml"))));
}

#[tokio::test]
async fn test_manifest() {
    let server = TestServer::start().await.unwrap();

    let resp = server.client.get(server.url("/manifest.json")).send().await.unwrap();
    assert_eq!(resp.headers()["content-type"], "application/manifest+json");

    let manifest: Value = resp.json().await.unwrap();
    assert_eq!(manifest["name"], "Panel Labels");
    assert_eq!(manifest["start_url"], "/");
    assert_eq!(manifest["icons"][0]["src"], "/static/images/icon.svg");
}
