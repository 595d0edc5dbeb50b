//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart store: load, mutate, persist, report
//! - `analytics` - Analytics events and GA4 Measurement Protocol dispatch
//! - `klaviyo` - Lead capture list subscriptions

pub mod analytics;
pub mod cart;
pub mod klaviyo;

pub use analytics::{AnalyticsEvent, AnalyticsTracker, Ga4Client};
pub use klaviyo::{KlaviyoClient, KlaviyoError, SubscribeOutcome};
