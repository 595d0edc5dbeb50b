//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};
use crate::offline::{OfflineCache, SyncManager};
use crate::services::analytics::{AnalyticsTracker, Ga4Client};
use crate::services::klaviyo::{KlaviyoClient, KlaviyoError};

/// Timeout for outbound HTTP calls (GA4, Klaviyo, sync endpoints).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("klaviyo error: {0}")]
    Klaviyo(#[from] KlaviyoError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like configuration, content, and background services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    content: ContentStore,
    analytics: AnalyticsTracker,
    ga4: Option<Ga4Client>,
    klaviyo: Option<KlaviyoClient>,
    sync: SyncManager,
    offline_cache: OfflineCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Loads content pages from `config.content_dir` and spawns the analytics
    /// dispatcher, so it must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be loaded or an HTTP client fails
    /// to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let content = ContentStore::load(&config.content_dir)?;
        let sync = SyncManager::new(&config.offline, http.clone());
        let ga4 = Ga4Client::from_config(&config.analytics, http);
        let analytics = AnalyticsTracker::spawn(ga4.clone(), sync.clone());
        let klaviyo = config
            .klaviyo
            .as_ref()
            .map(KlaviyoClient::new)
            .transpose()?;
        let offline_cache = OfflineCache::new(&config.offline);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                content,
                analytics,
                ga4,
                klaviyo,
                sync,
                offline_cache,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the markdown content store.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Get the analytics tracker.
    #[must_use]
    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.inner.analytics
    }

    /// Get the GA4 Measurement Protocol client, if configured.
    #[must_use]
    pub fn ga4(&self) -> Option<&Ga4Client> {
        self.inner.ga4.as_ref()
    }

    /// Get the Klaviyo client, if configured.
    #[must_use]
    pub fn klaviyo(&self) -> Option<&KlaviyoClient> {
        self.inner.klaviyo.as_ref()
    }

    /// Get the background sync manager.
    #[must_use]
    pub fn sync(&self) -> &SyncManager {
        &self.inner.sync
    }

    /// Get the offline response cache.
    #[must_use]
    pub fn offline_cache(&self) -> &OfflineCache {
        &self.inner.offline_cache
    }
}
