//! Cart store: load, mutate, persist, and report.
//!
//! Every mutation runs load → apply → persist against the visitor's storage.
//! When the mutation produced a [`CartEvent`], the event is forwarded to the
//! analytics tracker and a snapshot of the cart is queued for `cart-sync`.
//! Neither side effect can fail the request.

use chrono::Utc;
use panel_labels_core::offline::CartSyncEntry;
use panel_labels_core::{CartEvent, CartState};

use crate::error::{Result, add_breadcrumb};
use crate::services::analytics::AnalyticsEvent;
use crate::state::AppState;
use crate::storage::{self, KeyValueStore};

/// Load the visitor's cart.
///
/// # Errors
///
/// Returns an error if the storage backend fails.
pub async fn load(store: &impl KeyValueStore) -> Result<CartState> {
    Ok(storage::load_cart(store).await?)
}

/// Apply a mutation to the visitor's cart and persist it.
///
/// Returns the cart after the mutation together with the event it produced.
/// A mutation that changes nothing is not persisted and reports no event.
///
/// # Errors
///
/// Returns an error if loading or persisting the cart fails.
pub async fn mutate<F>(
    state: &AppState,
    store: &impl KeyValueStore,
    apply: F,
) -> Result<(CartState, Option<CartEvent>)>
where
    F: FnOnce(&mut CartState) -> Option<CartEvent> + Send,
{
    let mut cart = storage::load_cart(store).await?;
    let Some(event) = apply(&mut cart) else {
        return Ok((cart, None));
    };

    storage::save_cart(store, &cart).await?;
    report(state, &cart, &event).await;

    Ok((cart, Some(event)))
}

async fn report(state: &AppState, cart: &CartState, event: &CartEvent) {
    let client_id = cart.cart_id.to_string();
    add_breadcrumb("cart", event_label(event), Some(&[("cart_id", client_id.as_str())]));

    state
        .analytics()
        .track(AnalyticsEvent::from_cart_event(&client_id, event));
    state
        .sync()
        .enqueue_cart(CartSyncEntry::snapshot(cart, Utc::now()))
        .await;
}

const fn event_label(event: &CartEvent) -> &'static str {
    match event {
        CartEvent::Added { .. } => "Added to cart",
        CartEvent::Removed { .. } => "Removed from cart",
        CartEvent::QuantityUpdated { .. } => "Updated cart quantity",
        CartEvent::Cleared { .. } => "Cleared cart",
    }
}
