//! Cart route handlers.
//!
//! The cart lives in the visitor's session (see [`crate::storage`]). Mutating
//! handlers answer with HTMX fragments and set `HX-Trigger: cart-updated`
//! when the cart changed, so the header badge and any cart summary re-fetch.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use std::str::FromStr;

use panel_labels_core::{CartItem, CartState, ProductId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::catalog;
use crate::error::Result;
use crate::filters;
use crate::routes::PageContext;
use crate::services::cart as cart_service;
use crate::state::AppState;
use crate::storage::SessionStorage;

/// HTMX event fired after any cart change.
pub const CART_UPDATED_TRIGGER: (&str, &str) = ("HX-Trigger", "cart-updated");

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone, Debug)]
pub struct CartItemView {
    pub product_id: u32,
    pub slug: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.as_u32(),
            slug: item.product.slug.clone(),
            name: item.product.name.clone(),
            image: item.product.image.clone().unwrap_or_default(),
            quantity: item.quantity,
            unit_price: item.product.price.display(),
            line_total: item.line_total().display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    /// Amount left to qualify for free shipping, empty once qualified.
    pub free_shipping_remaining: String,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        let totals = cart.totals();
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            item_count: cart.item_count(),
            subtotal: totals.subtotal.display(),
            tax: totals.tax.display(),
            shipping: if totals.shipping.is_zero() {
                "Free".to_string()
            } else {
                totals.shipping.display()
            },
            total: totals.total.display(),
            free_shipping_remaining: totals
                .remaining_for_free_shipping()
                .map(|p| p.display())
                .unwrap_or_default(),
        }
    }
}

/// JSON cart summary returned by `GET /cart/summary`.
#[derive(Debug, Serialize)]
pub struct CartSummary {
    pub cart_id: String,
    pub item_count: u32,
    pub items: Vec<CartSummaryLine>,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub currency: &'static str,
}

/// One line of [`CartSummary`].
#[derive(Debug, Serialize)]
pub struct CartSummaryLine {
    pub product_id: u32,
    pub slug: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartState> for CartSummary {
    fn from(cart: &CartState) -> Self {
        let totals = cart.totals();
        Self {
            cart_id: cart.cart_id.to_string(),
            item_count: cart.item_count(),
            items: cart
                .items
                .iter()
                .map(|item| CartSummaryLine {
                    product_id: item.product.id.as_u32(),
                    slug: item.product.slug.clone(),
                    quantity: item.quantity,
                    unit_price: item.product.price.plain(),
                    line_total: item.line_total().plain(),
                })
                .collect(),
            subtotal: totals.subtotal.plain(),
            tax: totals.tax.plain(),
            shipping: totals.shipping.plain(),
            total: totals.total.plain(),
            currency: totals.total.currency_code.code(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
///
/// Fields arrive as raw strings so a malformed value answers with the inline
/// error fragment rather than a bare extractor rejection.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<String>,
}

/// Update cart form data.
///
/// The quantity is signed so that a zero or negative value removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    #[serde(default)]
    pub product_id: String,
}

const INVALID_PRODUCT: &str = "Choose a product from the catalog.";
const INVALID_QUANTITY: &str = "Enter a whole-number quantity.";

/// Parse a numeric form field, ignoring surrounding whitespace.
fn parse_field<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn parse_product_id(raw: &str) -> std::result::Result<ProductId, Response> {
    parse_field(raw)
        .map(ProductId::new)
        .ok_or_else(|| cart_error(StatusCode::BAD_REQUEST, INVALID_PRODUCT))
}

/// Quantity to add: defaults to 1 when blank, must be at least 1 otherwise.
fn parse_add_quantity(raw: Option<&str>) -> std::result::Result<u32, Response> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(raw) => parse_field::<u32>(raw)
            .filter(|quantity| *quantity > 0)
            .ok_or_else(|| cart_error(StatusCode::BAD_REQUEST, INVALID_QUANTITY)),
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Inline cart error fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_error.html")]
pub struct CartErrorTemplate {
    pub message: String,
}

fn cart_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        CartErrorTemplate {
            message: message.into(),
        },
    )
        .into_response()
}

/// Cart items fragment, triggering `cart-updated` when `changed`.
fn items_fragment(cart: &CartState, changed: bool) -> Response {
    let fragment = CartItemsTemplate {
        cart: CartView::from(cart),
    };
    if changed {
        (AppendHeaders([CART_UPDATED_TRIGGER]), fragment).into_response()
    } else {
        fragment.into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let cart = cart_service::load(&SessionStorage::new(session)).await?;

    Ok(CartShowTemplate {
        page: PageContext::new(&state, "/cart", "Your Cart").noindex(),
        cart: CartView::from(&cart),
    })
}

/// Add item to cart (HTMX).
///
/// Malformed fields answer 400, unknown products 404, and out-of-stock or
/// over-stock requests 400, each with an inline error fragment. On success returns the count
/// badge and triggers `cart-updated`.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let id = match parse_product_id(&form.product_id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let quantity = match parse_add_quantity(form.quantity.as_deref()) {
        Ok(quantity) => quantity,
        Err(response) => return Ok(response),
    };
    let Some(product) = catalog::by_id(id) else {
        return Ok(cart_error(StatusCode::NOT_FOUND, "That product no longer exists."));
    };
    if !product.in_stock() {
        return Ok(cart_error(
            StatusCode::BAD_REQUEST,
            format!("{} is out of stock.", product.name),
        ));
    }

    let store = SessionStorage::new(session);
    let in_cart = cart_service::load(&store)
        .await?
        .item(product.id)
        .map_or(0, |item| item.quantity);
    if in_cart.saturating_add(quantity) > product.stock {
        return Ok(cart_error(
            StatusCode::BAD_REQUEST,
            format!("Only {} of {} available.", product.stock, product.name),
        ));
    }

    let (cart, event) = cart_service::mutate(&state, &store, |cart| cart.add(product, quantity)).await?;
    let badge = CartCountTemplate {
        count: cart.item_count(),
    };

    Ok(if event.is_some() {
        (AppendHeaders([CART_UPDATED_TRIGGER]), badge).into_response()
    } else {
        badge.into_response()
    })
}

/// Update cart line quantity (HTMX).
///
/// # Errors
///
/// Returns an error if the session store fails. A malformed field or a
/// quantity above available stock answers 400 with an inline error fragment.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let id = match parse_product_id(&form.product_id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let Some(quantity) = parse_field::<i64>(&form.quantity) else {
        return Ok(cart_error(StatusCode::BAD_REQUEST, INVALID_QUANTITY));
    };
    if let Some(product) = catalog::by_id(id)
        && quantity > i64::from(product.stock)
    {
        return Ok(cart_error(
            StatusCode::BAD_REQUEST,
            format!("Only {} of {} available.", product.stock, product.name),
        ));
    }

    let (cart, event) = cart_service::mutate(&state, &SessionStorage::new(session), |cart| {
        cart.update_quantity(id, quantity)
    })
    .await?;

    Ok(items_fragment(&cart, event.is_some()))
}

/// Remove a line from the cart (HTMX).
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let id = match parse_product_id(&form.product_id) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let (cart, event) =
        cart_service::mutate(&state, &SessionStorage::new(session), |cart| cart.remove(id)).await?;

    Ok(items_fragment(&cart, event.is_some()))
}

/// Empty the cart (HTMX).
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response> {
    let (cart, event) =
        cart_service::mutate(&state, &SessionStorage::new(session), CartState::clear).await?;

    Ok(items_fragment(&cart, event.is_some()))
}

/// Cart count badge (HTMX).
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let cart = cart_service::load(&SessionStorage::new(session)).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}

/// Cart totals as JSON.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(session))]
pub async fn summary(session: Session) -> Result<Json<CartSummary>> {
    let cart = cart_service::load(&SessionStorage::new(session)).await?;
    Ok(Json(CartSummary::from(&cart)))
}
