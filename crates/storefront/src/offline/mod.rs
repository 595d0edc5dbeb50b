//! Offline support: response cache and background sync.
//!
//! - [`cache`] - named response caches, precache on install, purge on activate
//! - [`layer`] - cache-first middleware with offline fallback
//! - [`policy`] - bypass and dynamic-content path rules
//! - [`sync`] - offline queues drained to the sync endpoints

pub mod cache;
pub mod layer;
pub mod policy;
pub mod sync;

pub use cache::{CacheStatus, CachedResponse, Lifecycle, OfflineCache};
pub use layer::cache_first_middleware;
pub use sync::{SyncError, SyncManager};
