//! Checkout hand-off.
//!
//! Payment is handled by an external checkout provider. With `CHECKOUT_URL`
//! configured the visitor is redirected there carrying the cart as
//! `?items=slug:qty,...`; otherwise a read-only order summary is shown.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use panel_labels_core::CartState;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::routes::PageContext;
use crate::routes::cart::CartView;
use crate::services::AnalyticsEvent;
use crate::services::cart as cart_service;
use crate::state::AppState;
use crate::storage::SessionStorage;

/// Checkout summary template, shown when no provider is configured.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/summary.html")]
pub struct CheckoutSummaryTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// `slug:qty` pairs joined with commas.
fn items_param(cart: &CartState) -> String {
    cart.items
        .iter()
        .map(|item| format!("{}:{}", item.product.slug, item.quantity))
        .collect::<Vec<_>>()
        .join(",")
}

/// The provider URL with the cart appended as the `items` query parameter.
#[must_use]
pub fn checkout_url(base: &Url, cart: &CartState) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("items", &items_param(cart));
    url
}

/// Hand the cart off to checkout.
///
/// An empty cart redirects back to `/cart`.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let cart = cart_service::load(&SessionStorage::new(session)).await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let cart_id = cart.cart_id.to_string();
    add_breadcrumb("checkout", "Began checkout", Some(&[("cart_id", cart_id.as_str())]));
    state.analytics().track(AnalyticsEvent::begin_checkout(&cart));

    if let Some(base) = &state.config().checkout_url {
        let url = checkout_url(base, &cart);
        tracing::info!(cart_id = %cart_id, items = cart.item_count(), "Redirecting to checkout");
        return Ok(Redirect::to(url.as_str()).into_response());
    }

    Ok(CheckoutSummaryTemplate {
        page: PageContext::new(&state, "/checkout", "Checkout").noindex(),
        cart: CartView::from(&cart),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_checkout_url_carries_items() {
        let mut cart = CartState::new();
        cart.add(catalog::by_slug("residential-40-circuit-kit").unwrap(), 2);
        cart.add(catalog::by_slug("contractor-10-pack").unwrap(), 1);

        let base = Url::parse("https://checkout.test/cart?ref=labels").unwrap();
        let url = checkout_url(&base, &cart);

        let items: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "items")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(items, vec!["residential-40-circuit-kit:2,contractor-10-pack:1"]);
        assert!(url.query().unwrap().starts_with("ref=labels&"));
    }
}
