//! Panel Labels Core - Shared domain types.
//!
//! This crate provides the types used across all Panel Labels components:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for catalog inspection and quotes
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage backends. Persistence and dispatch live in the
//! storefront, which feeds these types through its own adapters.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, and emails
//! - [`product`] - Catalog product model
//! - [`cart`] - Cart state, mutations, and derived totals
//! - [`persist`] - Versioned envelope for persisted state snapshots
//! - [`offline`] - Offline queue entries and sync payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod offline;
pub mod persist;
pub mod product;
pub mod types;

pub use cart::{CartEvent, CartItem, CartProduct, CartState, CartTotals};
pub use persist::{PersistError, PersistedState};
pub use product::{PanelType, Product, ProductCategory, ProductSpecs};
pub use types::*;
