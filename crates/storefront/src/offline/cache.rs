//! Named response caches with an install/activate lifecycle.
//!
//! On startup the storefront installs the current cache (`panel-labels-{version}`)
//! by precaching a fixed URL list from the router, then activates it, which
//! deletes every other named cache. The cache-first middleware only answers
//! from cache once the lifecycle has reached [`Lifecycle::Activated`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::response::Response;
use moka::future::Cache;
use tokio::sync::{RwLock, watch};
use tower::ServiceExt;

use crate::config::OfflineConfig;

/// Prefix of every cache name.
pub const CACHE_NAME_PREFIX: &str = "panel-labels-";

/// URLs fetched into the cache on install.
pub const PRECACHE_URLS: &[&str] = &[
    "/",
    "/products",
    "/offline",
    "/manifest.json",
    "/static/css/main.css",
    "/static/js/app.js",
];

/// Page served to navigation requests when the network fails.
pub const OFFLINE_PAGE: &str = "/offline";

/// Header reporting how a response was produced.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Largest body the cache will buffer.
pub const MAX_CACHED_BODY_BYTES: usize = 5 * 1024 * 1024;

const MAX_ENTRIES_PER_CACHE: u64 = 1_000;

/// A named cache of buffered responses keyed by path and query.
pub type ResponseCache = Cache<String, CachedResponse>;

/// Where the cache is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Installing,
    Installed,
    Activating,
    Activated,
}

/// How a response was produced, reported in `x-cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Offline,
}

impl CacheStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Offline => "offline",
        }
    }
}

// =============================================================================
// Cached Response
// =============================================================================

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Returns true for `200 OK` responses that set no cookies and whose body
    /// is known to fit within [`MAX_CACHED_BODY_BYTES`].
    #[must_use]
    pub fn is_cacheable(response: &Response) -> bool {
        if response.status() != StatusCode::OK
            || response.headers().contains_key(header::SET_COOKIE)
        {
            return false;
        }

        let declared = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let upper = declared.or_else(|| response.body().size_hint().upper());

        upper.is_some_and(|len| {
            usize::try_from(len).is_ok_and(|len| len <= MAX_CACHED_BODY_BYTES)
        })
    }

    /// Buffer a response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body stream fails or exceeds the size limit.
    pub async fn buffer(response: Response) -> Result<Self, axum::Error> {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await?;
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Rebuild a response, tagged with how it was produced.
    #[must_use]
    pub fn to_response(&self, cache_status: CacheStatus) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response.headers_mut().insert(
            CACHE_STATUS_HEADER,
            HeaderValue::from_static(cache_status.as_str()),
        );
        response
    }
}

// =============================================================================
// Offline Cache
// =============================================================================

/// Named response caches plus the lifecycle of the current one.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct OfflineCache {
    inner: Arc<OfflineCacheInner>,
}

struct OfflineCacheInner {
    name: String,
    ttl: Duration,
    fetch_timeout: Duration,
    caches: RwLock<HashMap<String, ResponseCache>>,
    lifecycle: watch::Sender<Lifecycle>,
    origin: OnceLock<Router>,
}

impl OfflineCache {
    #[must_use]
    pub fn new(config: &OfflineConfig) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Installing);
        Self {
            inner: Arc::new(OfflineCacheInner {
                name: format!("{CACHE_NAME_PREFIX}{}", config.cache_version),
                ttl: config.cache_ttl,
                fetch_timeout: config.fetch_timeout,
                caches: RwLock::new(HashMap::new()),
                lifecycle,
                origin: OnceLock::new(),
            }),
        }
    }

    /// Name of the current cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle() == Lifecycle::Activated
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.inner.fetch_timeout
    }

    /// Router used for background refreshes, set by [`Self::install`].
    #[must_use]
    pub fn origin(&self) -> Option<Router> {
        self.inner.origin.get().cloned()
    }

    /// Open a named cache, creating it if needed.
    pub async fn open(&self, name: &str) -> ResponseCache {
        if let Some(cache) = self.inner.caches.read().await.get(name) {
            return cache.clone();
        }
        self.inner
            .caches
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| {
                Cache::builder()
                    .max_capacity(MAX_ENTRIES_PER_CACHE)
                    .time_to_live(self.inner.ttl)
                    .build()
            })
            .clone()
    }

    /// Names of every open cache, sorted.
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Delete a named cache. Returns true if it existed.
    pub async fn delete(&self, name: &str) -> bool {
        let removed = self.inner.caches.write().await.remove(name);
        match removed {
            Some(cache) => {
                cache.invalidate_all();
                true
            }
            None => false,
        }
    }

    /// Look up a response in the current cache.
    pub async fn lookup(&self, key: &str) -> Option<CachedResponse> {
        self.open(self.name()).await.get(key).await
    }

    /// Store a response in the current cache.
    pub async fn store(&self, key: &str, response: CachedResponse) {
        self.open(self.name())
            .await
            .insert(key.to_string(), response)
            .await;
    }

    /// Precache [`PRECACHE_URLS`] from `origin` into the current cache.
    ///
    /// URLs that fail or return an uncacheable response are logged and
    /// skipped. Returns the number of URLs cached.
    pub async fn install(&self, origin: Router) -> usize {
        self.inner.lifecycle.send_replace(Lifecycle::Installing);
        self.open(self.name()).await;

        let mut cached = 0;
        for &url in PRECACHE_URLS {
            match precache_one(&origin, url).await {
                Ok(response) => {
                    self.store(url, response).await;
                    cached += 1;
                }
                Err(reason) => {
                    tracing::warn!(url, reason = %reason, "Skipping precache URL");
                }
            }
        }

        if self.inner.origin.set(origin).is_err() {
            tracing::debug!("Offline cache origin already set");
        }
        self.inner.lifecycle.send_replace(Lifecycle::Installed);
        tracing::info!(cache = %self.name(), cached, "Offline cache installed");
        cached
    }

    /// Delete every cache other than the current one and start serving.
    pub async fn activate(&self) {
        self.inner.lifecycle.send_replace(Lifecycle::Activating);

        for name in self.cache_names().await {
            if name != self.name() && self.delete(&name).await {
                tracing::info!(cache = %name, "Deleted stale cache");
            }
        }

        self.inner.lifecycle.send_replace(Lifecycle::Activated);
        tracing::info!(cache = %self.name(), "Offline cache activated");
    }
}

async fn precache_one(origin: &Router, url: &str) -> Result<CachedResponse, String> {
    let request = Request::get(url)
        .header(header::ACCEPT, "text/html,*/*")
        .body(Body::empty())
        .map_err(|e| e.to_string())?;

    let response = origin
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;

    if !CachedResponse::is_cacheable(&response) {
        return Err(format!("uncacheable response ({})", response.status()));
    }
    CachedResponse::buffer(response)
        .await
        .map_err(|e| e.to_string())
}
