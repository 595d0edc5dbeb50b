//! Newsletter sign-up route handler.
//!
//! With Klaviyo configured the address is subscribed to the marketing list;
//! otherwise the lead is logged. Either way a `generate_lead` event is
//! tracked and the form is replaced by a result fragment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use panel_labels_core::Email;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::services::{AnalyticsEvent, SubscribeOutcome};
use crate::state::AppState;
use crate::storage::{self, SessionStorage};

/// Source recorded when the form does not name one.
const DEFAULT_SOURCE: &str = "footer";

/// Longest accepted `source` value.
const MAX_SOURCE_LEN: usize = 32;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Success fragment template (replaces the form via HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_success.html")]
pub struct SubscribeSuccessTemplate {
    pub email: String,
}

/// Error fragment template (replaces the form via HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_error.html")]
pub struct SubscribeErrorTemplate {
    pub message: String,
    pub email: String,
    pub source: String,
}

/// Keep `source` to a short slug; anything else becomes the default.
fn normalize_source(source: Option<&str>) -> String {
    source
        .map(str::trim)
        .filter(|s| {
            !s.is_empty()
                && s.len() <= MAX_SOURCE_LEN
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map_or_else(|| DEFAULT_SOURCE.to_string(), str::to_ascii_lowercase)
}

/// Subscribe to the newsletter (HTMX).
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session, form), fields(source = tracing::field::Empty))]
pub async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SubscribeForm>,
) -> Result<Response> {
    let source = normalize_source(form.source.as_deref());
    tracing::Span::current().record("source", source.as_str());

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected newsletter email");
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                SubscribeErrorTemplate {
                    message: "Please enter a valid email address.".to_string(),
                    email: form.email.trim().to_string(),
                    source,
                },
            )
                .into_response());
        }
    };

    if let Some(klaviyo) = state.klaviyo() {
        match klaviyo.subscribe(&email, &source).await {
            Ok(SubscribeOutcome::Subscribed) => {
                tracing::info!(domain = %email.domain(), "Newsletter subscription successful");
            }
            Ok(SubscribeOutcome::AlreadySubscribed) => {
                tracing::info!(domain = %email.domain(), "Email already subscribed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Newsletter subscription failed");
                return Ok((
                    StatusCode::BAD_GATEWAY,
                    SubscribeErrorTemplate {
                        message: "Something went wrong. Please try again.".to_string(),
                        email: email.into_inner(),
                        source,
                    },
                )
                    .into_response());
            }
        }
    } else {
        tracing::info!(domain = %email.domain(), "Lead captured (no list configured)");
    }

    let client_id = storage::client_id(&SessionStorage::new(session)).await?;
    state.analytics().track(AnalyticsEvent::generate_lead(
        &client_id.to_string(),
        &source,
    ));

    Ok(SubscribeSuccessTemplate {
        email: email.into_inner(),
    }
    .into_response())
}
