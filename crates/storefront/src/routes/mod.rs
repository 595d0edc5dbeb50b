//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Products
//! GET  /products               - Product listing (?category=standard|custom|bulk)
//! GET  /products/{slug}        - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (cart items fragment)
//! POST /cart/remove            - Remove line (cart items fragment)
//! POST /cart/clear             - Empty the cart (cart items fragment)
//! GET  /cart/count             - Cart count badge fragment
//! GET  /cart/summary           - Cart totals as JSON
//!
//! # Checkout
//! GET  /checkout               - Hand off to the checkout provider
//!
//! # Content
//! GET  /faq, /how-it-works, /terms, /privacy, /shipping, /returns
//! GET  /offline                - Offline fallback page
//!
//! # Lead capture
//! POST /newsletter/subscribe   - Email sign-up (HTMX fragment)
//!
//! # Machine-readable
//! GET  /manifest.json          - Web app manifest
//! GET  /sitemap.xml
//! GET  /robots.txt
//!
//! # API
//! POST /api/analytics/event    - Browser analytics beacon
//! POST /api/cart/sync          - Offline cart queue receiver
//! POST /api/analytics/sync     - Offline analytics queue receiver
//! ```

pub mod api;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod manifest;
pub mod newsletter;
pub mod pages;
pub mod products;
pub mod seo;

use axum::{
    Router,
    routing::{get, post},
};
use serde_json::Value;

use crate::config::AnalyticsConfig;
use crate::middleware::{api_rate_limiter, lead_rate_limiter};
use crate::seo::{MetaTags, render_json_ld};
use crate::state::AppState;

// =============================================================================
// Page Context
// =============================================================================

/// Data every full page passes to `base.html`.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub meta: MetaTags,
    /// Serialized JSON-LD, empty when the page has none.
    pub json_ld: String,
    pub ga4_measurement_id: String,
    pub meta_pixel_id: String,
    pub google_ads_id: String,
    pub google_ads_conversion_label: String,
}

impl PageContext {
    /// Context for the page at `path`.
    #[must_use]
    pub fn new(state: &AppState, path: &str, title: &str) -> Self {
        let config = state.config();
        let AnalyticsConfig {
            ga4_measurement_id,
            meta_pixel_id,
            google_ads_id,
            google_ads_conversion_label,
            ..
        } = &config.analytics;

        Self {
            meta: MetaTags::new(&config.base_url, path, title),
            json_ld: String::new(),
            ga4_measurement_id: ga4_measurement_id.clone().unwrap_or_default(),
            meta_pixel_id: meta_pixel_id.clone().unwrap_or_default(),
            google_ads_id: google_ads_id.clone().unwrap_or_default(),
            google_ads_conversion_label: google_ads_conversion_label.clone().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta = self.meta.description(description);
        self
    }

    #[must_use]
    pub fn meta(mut self, apply: impl FnOnce(MetaTags) -> MetaTags) -> Self {
        self.meta = apply(self.meta);
        self
    }

    #[must_use]
    pub fn noindex(self) -> Self {
        self.meta(MetaTags::noindex)
    }

    #[must_use]
    pub fn json_ld(mut self, blocks: &[Value]) -> Self {
        self.json_ld = if blocks.is_empty() {
            String::new()
        } else {
            render_json_ld(blocks)
        };
        self
    }

    /// Whether any client-side tag is configured.
    #[must_use]
    pub fn has_analytics(&self) -> bool {
        !(self.ga4_measurement_id.is_empty()
            && self.meta_pixel_id.is_empty()
            && self.google_ads_id.is_empty())
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        .route("/cart/update", post(cart::update))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/clear", post(cart::clear))
        .route("/cart/count", get(cart::count))
        .route("/cart/summary", get(cart::summary))
        .route("/checkout", get(checkout::checkout))
}

/// Create the content page routes router.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/faq", get(pages::faq))
        .route("/how-it-works", get(pages::how_it_works))
        .route("/terms", get(pages::terms))
        .route("/privacy", get(pages::privacy))
        .route("/shipping", get(pages::shipping))
        .route("/returns", get(pages::returns))
        .route("/offline", get(pages::offline))
}

/// Create the lead capture routes router (rate limited).
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .layer(lead_rate_limiter())
}

/// Create the API routes router (rate limited).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/event", post(api::analytics_event))
        .route("/api/cart/sync", post(api::cart_sync))
        .route("/api/analytics/sync", post(api::analytics_sync))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(product_routes())
        .merge(cart_routes())
        .merge(page_routes())
        .merge(newsletter_routes())
        .merge(api_routes())
        .route("/manifest.json", get(manifest::manifest))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
}
