//! Cache-first request handling.
//!
//! Applied with `axum::middleware::from_fn_with_state` in front of the router.
//! GET requests outside the bypass list are answered from the current cache
//! when possible; a hit on a dynamic path also refreshes the entry in the
//! background. Misses go to the network and cacheable responses are stored.
//! When the network fails, navigation requests get the cached offline page and
//! everything else gets `503 Offline`.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;

use super::cache::{CacheStatus, CachedResponse, OFFLINE_PAGE, OfflineCache};
use super::policy;

/// Cache-first middleware.
pub async fn cache_first_middleware(
    State(cache): State<OfflineCache>,
    request: Request,
    next: Next,
) -> Response {
    if !cache.is_active()
        || request.method() != Method::GET
        || policy::is_bypassed(request.uri().path())
    {
        return next.run(request).await;
    }

    let key = cache_key(&request);
    let navigation = is_navigation(request.headers());

    if let Some(hit) = cache.lookup(&key).await {
        if policy::is_dynamic(request.uri().path()) {
            spawn_refresh(cache.clone(), key.clone(), request.headers().clone());
        }
        tracing::debug!(%key, "Offline cache hit");
        return hit.to_response(CacheStatus::Hit);
    }

    let Some(response) = fetch(&cache, &key, next.run(request)).await else {
        return offline_fallback(&cache, navigation).await;
    };

    if !CachedResponse::is_cacheable(&response) {
        return response;
    }

    match CachedResponse::buffer(response).await {
        Ok(cached) => {
            cache.store(&key, cached.clone()).await;
            cached.to_response(CacheStatus::Miss)
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "Failed to read response body");
            offline_fallback(&cache, navigation).await
        }
    }
}

/// Run a network fetch under the cache's timeout.
///
/// Returns `None` on timeout or a gateway failure (502/503/504).
async fn fetch(
    cache: &OfflineCache,
    key: &str,
    network: impl Future<Output = Response>,
) -> Option<Response> {
    match tokio::time::timeout(cache.fetch_timeout(), network).await {
        Ok(response) if is_gateway_failure(response.status()) => {
            tracing::warn!(%key, status = %response.status(), "Network fetch failed");
            None
        }
        Ok(response) => Some(response),
        Err(_) => {
            tracing::warn!(%key, "Network fetch timed out");
            None
        }
    }
}

fn spawn_refresh(cache: OfflineCache, key: String, headers: HeaderMap) {
    let Some(origin) = cache.origin() else {
        return;
    };

    tokio::spawn(async move {
        let mut builder = Request::get(key.as_str());
        for (name, value) in &headers {
            if name != header::COOKIE {
                builder = builder.header(name, value);
            }
        }
        let request = match builder.body(Body::empty()) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%key, error = %e, "Cannot build refresh request");
                return;
            }
        };

        let Some(response) = fetch(&cache, &key, async {
            match origin.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
        .await
        else {
            return;
        };

        if !CachedResponse::is_cacheable(&response) {
            return;
        }
        match CachedResponse::buffer(response).await {
            Ok(cached) => {
                cache.store(&key, cached).await;
                tracing::debug!(%key, "Refreshed cached response");
            }
            Err(e) => tracing::debug!(%key, error = %e, "Background refresh failed"),
        }
    });
}

async fn offline_fallback(cache: &OfflineCache, navigation: bool) -> Response {
    if navigation && let Some(page) = cache.lookup(OFFLINE_PAGE).await {
        let mut response = page.to_response(CacheStatus::Offline);
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        return response;
    }
    (StatusCode::SERVICE_UNAVAILABLE, "Offline").into_response()
}

fn cache_key(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string)
}

fn is_navigation(headers: &HeaderMap) -> bool {
    let navigate = headers
        .get("sec-fetch-mode")
        .is_some_and(|v| v.as_bytes() == b"navigate");
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));
    navigate || accepts_html
}

const fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::Router;
    use axum::body::to_bytes;
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, post};

    use super::*;
    use crate::config::OfflineConfig;
    use crate::offline::cache::CACHE_STATUS_HEADER;

    fn config() -> OfflineConfig {
        let mut config = OfflineConfig::with_defaults("http://localhost:3000").unwrap();
        config.fetch_timeout = Duration::from_millis(200);
        config
    }

    fn origin(hits: Arc<AtomicUsize>) -> Router {
        let renders = Arc::new(AtomicUsize::new(0));
        Router::new()
            .route(
                "/products",
                get(move || {
                    let n = renders.fetch_add(1, Ordering::SeqCst);
                    async move { format!("products {n}") }
                }),
            )
            .route(
                "/terms",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        format!("terms {n}")
                    }
                }),
            )
            .route("/offline", get(|| async { "you are offline" }))
            .route(
                "/down",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            )
            .route("/cart", get(|| async { "cart" }))
            .route("/form", post(|| async { "posted" }))
    }

    async fn active_app(hits: Arc<AtomicUsize>) -> (Router, OfflineCache) {
        let cache = OfflineCache::new(&config());
        let origin = origin(hits);
        cache.install(origin.clone()).await;
        cache.activate().await;
        let app = origin.layer(from_fn_with_state(cache.clone(), cache_first_middleware));
        (app, cache)
    }

    fn get_html(uri: &str) -> Request {
        Request::get(uri)
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (app, _) = active_app(hits.clone()).await;

        let first = app.clone().oneshot(get_html("/terms")).await.unwrap();
        assert_eq!(first.headers()[CACHE_STATUS_HEADER], "miss");
        assert_eq!(body_text(first).await, "terms 0");

        let second = app.oneshot(get_html("/terms")).await.unwrap();
        assert_eq!(second.headers()[CACHE_STATUS_HEADER], "hit");
        assert_eq!(body_text(second).await, "terms 0");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dynamic_hit_refreshes_entry() {
        let (app, cache) = active_app(Arc::new(AtomicUsize::new(0))).await;

        // Precached on install
        let first = app.clone().oneshot(get_html("/products")).await.unwrap();
        assert_eq!(first.headers()[CACHE_STATUS_HEADER], "hit");
        assert_eq!(body_text(first).await, "products 0");

        let mut cached = String::new();
        for _ in 0..50 {
            let entry = cache.lookup("/products").await.unwrap();
            cached = String::from_utf8(entry.body.to_vec()).unwrap();
            if cached != "products 0" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(cached, "products 1");

        let second = app.oneshot(get_html("/products")).await.unwrap();
        assert_eq!(second.headers()[CACHE_STATUS_HEADER], "hit");
        assert_eq!(body_text(second).await, "products 1");
    }

    #[tokio::test]
    async fn test_bypass_and_non_get_pass_through() {
        let (app, _) = active_app(Arc::new(AtomicUsize::new(0))).await;

        let cart = app.clone().oneshot(get_html("/cart")).await.unwrap();
        assert!(cart.headers().get(CACHE_STATUS_HEADER).is_none());

        let post = app
            .oneshot(Request::post("/form").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(post.status(), StatusCode::OK);
        assert!(post.headers().get(CACHE_STATUS_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_serves_offline_page_to_navigation() {
        let (app, _) = active_app(Arc::new(AtomicUsize::new(0))).await;

        let page = app.clone().oneshot(get_html("/down")).await.unwrap();
        assert_eq!(page.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(page.headers()[CACHE_STATUS_HEADER], "offline");
        assert_eq!(body_text(page).await, "you are offline");

        let asset = app
            .oneshot(Request::get("/down").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(asset.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(asset).await, "Offline");
    }

    #[tokio::test]
    async fn test_timeout_is_network_failure() {
        let (app, _) = active_app(Arc::new(AtomicUsize::new(0))).await;
        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_inactive_cache_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let cache = OfflineCache::new(&config());
        let app = origin(hits.clone()).layer(from_fn_with_state(cache, cache_first_middleware));

        app.clone().oneshot(get_html("/terms")).await.unwrap();
        let response = app.oneshot(get_html("/terms")).await.unwrap();
        assert!(response.headers().get(CACHE_STATUS_HEADER).is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_navigation_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_navigation(&headers));
        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert!(is_navigation(&headers));
    }
}
