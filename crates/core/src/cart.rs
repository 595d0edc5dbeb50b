//! Shopping cart state, mutations, and derived totals.
//!
//! [`CartState`] is the persisted part of the cart: a list of line items.
//! Everything monetary is derived on read through [`CartState::totals`].
//!
//! Every mutation returns the [`CartEvent`] it produced (or `None` when the
//! call changed nothing) so callers can forward it to analytics and sync
//! without the state knowing about either.
//!
//! Invariant: every stored line has `quantity >= 1`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::product::Product;
use crate::types::{Price, ProductId};

/// Sales tax applied to the subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Subtotal at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Flat shipping charged below the free-shipping threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(999, 0, 0, false, 2);

/// Snapshot of the product fields a cart line needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug.to_string(),
            name: product.name.to_string(),
            price: product.price,
            image: Some(product.image.to_string()),
        }
    }
}

/// A cart line: product reference plus quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// Monetary view computed from the cart's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CartTotals {
    /// Derive totals from a subtotal.
    ///
    /// - tax = subtotal × 8%, rounded to cents
    /// - shipping = 0 when subtotal ≥ $50, else $9.99
    /// - total = subtotal + tax + shipping
    #[must_use]
    pub fn from_subtotal(subtotal: Price) -> Self {
        let tax = (subtotal * TAX_RATE).round_to_cents();
        let shipping = if subtotal.amount >= FREE_SHIPPING_THRESHOLD {
            Price::new(Decimal::ZERO, subtotal.currency_code)
        } else {
            Price::new(FLAT_SHIPPING, subtotal.currency_code)
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }

    /// Amount still needed to reach free shipping, if any.
    #[must_use]
    pub fn remaining_for_free_shipping(&self) -> Option<Price> {
        (self.subtotal.amount < FREE_SHIPPING_THRESHOLD).then(|| {
            Price::new(
                FREE_SHIPPING_THRESHOLD - self.subtotal.amount,
                self.subtotal.currency_code,
            )
        })
    }
}

/// Something that happened to a cart, reported after each mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    /// Units were added (either a new line or merged into an existing one).
    Added {
        product: CartProduct,
        quantity: u32,
    },
    /// A line was removed entirely.
    Removed {
        product: CartProduct,
        quantity: u32,
    },
    /// A line's quantity was set to a new positive value.
    QuantityUpdated {
        product: CartProduct,
        from: u32,
        to: u32,
    },
    /// The cart was emptied.
    Cleared { item_count: u32 },
}

/// Persisted cart contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    /// Stable id for the cart, used as the analytics client id and sync key.
    pub cart_id: Uuid,
    pub items: Vec<CartItem>,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl CartState {
    /// Create an empty cart with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Create an empty cart owned by an existing visitor id.
    #[must_use]
    pub const fn with_id(cart_id: Uuid) -> Self {
        Self {
            cart_id,
            items: Vec::new(),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// Merges into an existing line for the same product, otherwise appends
    /// a new line. Adding zero units never creates a line.
    pub fn add(&mut self, product: impl Into<CartProduct>, quantity: u32) -> Option<CartEvent> {
        if quantity == 0 {
            return None;
        }
        let product = product.into();

        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product: product.clone(),
                quantity,
            });
        }

        Some(CartEvent::Added { product, quantity })
    }

    /// Remove the line for `id`, if present.
    pub fn remove(&mut self, id: ProductId) -> Option<CartEvent> {
        let index = self.items.iter().position(|i| i.product.id == id)?;
        let item = self.items.remove(index);
        Some(CartEvent::Removed {
            product: item.product,
            quantity: item.quantity,
        })
    }

    /// Set the quantity of the line for `id`.
    ///
    /// A quantity of zero or less removes the line.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> Option<CartEvent> {
        let Ok(quantity) = u32::try_from(quantity) else {
            return if quantity <= 0 { self.remove(id) } else { None };
        };
        if quantity == 0 {
            return self.remove(id);
        }

        let item = self.items.iter_mut().find(|i| i.product.id == id)?;
        let from = item.quantity;
        if from == quantity {
            return None;
        }
        item.quantity = quantity;
        Some(CartEvent::QuantityUpdated {
            product: item.product.clone(),
            from,
            to: quantity,
        })
    }

    /// Remove every line.
    pub fn clear(&mut self) -> Option<CartEvent> {
        if self.items.is_empty() {
            return None;
        }
        let item_count = self.item_count();
        self.items.clear();
        Some(CartEvent::Cleared { item_count })
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn item(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == id)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ price × quantity, exact.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal, tax, shipping, and grand total.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_subtotal(self.subtotal())
    }
}
