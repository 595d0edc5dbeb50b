//! `sitemap.xml` and `robots.txt`.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::catalog;
use crate::seo::{self, SitemapEntry};
use crate::state::AppState;

/// Serve the sitemap: static routes, the catalog, and every content page.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Response {
    let mut entries = seo::catalog_entries(catalog::all());
    let content = state.content();
    entries.extend(content.slugs().into_iter().filter_map(|slug| {
        let page = content.get_page(slug)?;
        Some(
            SitemapEntry::new(format!("/{slug}"), "monthly", "0.5")
                .last_modified(page.meta.updated_at),
        )
    }));

    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        seo::sitemap_xml(&state.config().base_url, &entries),
    )
        .into_response()
}

/// Serve `robots.txt`.
#[instrument(skip(state))]
pub async fn robots(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        seo::robots_txt(&state.config().base_url),
    )
        .into_response()
}
