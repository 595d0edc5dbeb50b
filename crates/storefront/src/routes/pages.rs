//! Content page route handlers.
//!
//! Serves the markdown pages loaded into [`crate::content::ContentStore`] and
//! the offline fallback page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::NaiveDate;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::PageContext;
use crate::seo;
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub page: PageContext,
    pub title: String,
    pub updated_at: Option<NaiveDate>,
    pub content_html: String,
}

/// Offline fallback page template.
#[derive(Template, WebTemplate)]
#[template(path = "offline.html")]
pub struct OfflineTemplate {
    pub page: PageContext,
}

/// Render the content page `slug`, optionally publishing its FAQ entries as
/// `FAQPage` structured data.
fn serve_content_page(state: &AppState, slug: &str, faq_schema: bool) -> Result<ContentPageTemplate> {
    let page = state
        .content()
        .get_page(slug)
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))?;

    let base_url = &state.config().base_url;
    let path = format!("/{slug}");
    let mut json_ld = vec![seo::breadcrumbs(
        base_url,
        &[("Home", "/"), (page.meta.title.as_str(), path.as_str())],
    )];
    if faq_schema && !page.faq.is_empty() {
        json_ld.push(seo::faq_page(&page.faq));
    }

    let mut context = PageContext::new(state, &path, &page.meta.title).json_ld(&json_ld);
    if let Some(description) = &page.meta.description {
        context = context.description(description.clone());
    }

    Ok(ContentPageTemplate {
        page: context,
        title: page.meta.title.clone(),
        updated_at: page.meta.updated_at,
        content_html: page.content_html.clone(),
    })
}

/// Display the FAQ page with `FAQPage` structured data.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn faq(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "faq", true)
}

/// Display the How It Works page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn how_it_works(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "how-it-works", false)
}

/// Display the Terms of Service page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn terms(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "terms", false)
}

/// Display the Privacy Policy page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn privacy(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "privacy", false)
}

/// Display the Shipping page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn shipping(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "shipping", false)
}

/// Display the Returns page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state))]
pub async fn returns(State(state): State<AppState>) -> Result<impl IntoResponse> {
    serve_content_page(&state, "returns", false)
}

/// Display the offline fallback page.
///
/// Precached on install and served by the offline cache when the network
/// fails for a navigation request.
#[instrument(skip(state))]
pub async fn offline(State(state): State<AppState>) -> impl IntoResponse {
    OfflineTemplate {
        page: PageContext::new(&state, "/offline", "You're offline").noindex(),
    }
}
