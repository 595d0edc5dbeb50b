//! Web app manifest route handler.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::seo::{DEFAULT_DESCRIPTION, SITE_NAME};

/// Brand color used for the browser toolbar.
const THEME_COLOR: &str = "#f2a900";

/// Background while the app shell loads.
const BACKGROUND_COLOR: &str = "#111827";

/// Serve the web app manifest.
pub async fn manifest() -> Response {
    let manifest = json!({
        "name": SITE_NAME,
        "short_name": "Labels",
        "description": DEFAULT_DESCRIPTION,
        "start_url": "/",
        "scope": "/",
        "display": "standalone",
        "theme_color": THEME_COLOR,
        "background_color": BACKGROUND_COLOR,
        "icons": [
            {
                "src": "/static/images/icon.svg",
                "sizes": "any",
                "type": "image/svg+xml",
                "purpose": "any maskable"
            }
        ]
    });

    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        manifest.to_string(),
    )
        .into_response()
}
