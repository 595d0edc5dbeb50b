//! Integration tests for Panel Labels.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p panel-labels-integration-tests
//! ```
//!
//! Each test starts its own storefront on an ephemeral port with
//! [`TestServer::start`] and talks to it over real HTTP, so sessions
//! and rate limiting behave as in production.
//!
//! # Test Categories
//!
//! - `pages` - Home, catalog, content pages, health checks
//! - `cart` - Cart store and checkout hand-off
//! - `seo` - Sitemap, robots, manifest, structured data
//! - `api` - Newsletter, analytics beacon, and sync receivers
//! - `offline` - Offline cache and background sync
//!
//! Server-side GA4 delivery is observed through a local [`Collector`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use panel_labels_storefront::build_router;
use panel_labels_storefront::config::{StorefrontConfig, test_config};
use panel_labels_storefront::state::AppState;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Error starting a test server.
pub type StartError = Box<dyn std::error::Error + Send + Sync>;

/// A storefront listening on `127.0.0.1` for the duration of a test.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a storefront with the default test configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or state fails to build.
    pub async fn start() -> Result<Self, StartError> {
        Self::start_with(|_| {}).await
    }

    /// Start a storefront, letting the caller adjust its configuration.
    ///
    /// `configure` runs after the base URL and sync endpoint are pointed at
    /// the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or state fails to build.
    pub async fn start_with(
        configure: impl FnOnce(&mut StorefrontConfig),
    ) -> Result<Self, StartError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{addr}");

        let mut config = test_config(&base_url);
        config.port = addr.port();
        configure(&mut config);

        let state = AppState::new(config)?;
        let router = build_router(state.clone()).await;

        let handle = tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            let _ = axum::serve(listener, service).await;
        });

        Ok(Self {
            base_url,
            state,
            client: browser()?,
            handle,
        })
    }

    /// Absolute URL for a path on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A second client with its own cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn new_visitor(&self) -> Result<Client, reqwest::Error> {
        browser()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn browser() -> Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

// =============================================================================
// GA4 collector
// =============================================================================

/// A local stand-in for the GA4 Measurement Protocol endpoint.
///
/// Records every request body and answers with a configurable status.
#[derive(Clone)]
pub struct Collector {
    pub url: String,
    bodies: Arc<Mutex<Vec<Value>>>,
    status: Arc<AtomicU16>,
}

impl Collector {
    /// Start a collector answering `status` to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn start(status: u16) -> Result<Self, StartError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let collector = Self {
            url: format!("http://{}/mp/collect", listener.local_addr()?),
            bodies: Arc::default(),
            status: Arc::new(AtomicU16::new(status)),
        };

        let app = axum::Router::new()
            .route("/mp/collect", post(collect))
            .with_state(collector.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(collector)
    }

    /// Point a storefront configuration's server-side GA4 at this collector.
    pub fn configure(&self, config: &mut StorefrontConfig) {
        config.analytics.ga4_measurement_id = Some("G-TEST".to_string());
        config.analytics.ga4_api_secret = Some(SecretString::from("mp-secret"));
        config.analytics.ga4_collect_url = Some(self.url.clone());
    }

    /// Change the status answered from now on.
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    /// Request bodies received so far.
    #[must_use]
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies
            .lock()
            .map(|bodies| bodies.clone())
            .unwrap_or_default()
    }

    /// Every received event as `(client_id, name)`, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<(String, String)> {
        self.bodies()
            .iter()
            .flat_map(|body| {
                let client_id = body["client_id"].as_str().unwrap_or_default().to_string();
                body["events"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(move |event| {
                        let name = event["name"].as_str().unwrap_or_default().to_string();
                        (client_id.clone(), name)
                    })
            })
            .collect()
    }

    /// Wait up to two seconds for at least `count` events to arrive.
    pub async fn wait_for_events(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.events()
    }
}

async fn collect(State(collector): State<Collector>, Json(body): Json<Value>) -> StatusCode {
    if let Ok(mut bodies) = collector.bodies.lock() {
        bodies.push(body);
    }
    StatusCode::from_u16(collector.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
