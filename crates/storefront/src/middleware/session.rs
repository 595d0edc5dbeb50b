//! Session middleware configuration.
//!
//! Visitor carts live in an in-memory, moka-backed tower-sessions store keyed
//! by the session cookie. Sessions are evicted once they expire or when the
//! store reaches capacity.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "pl_session";

/// Session expiry after inactivity (7 days).
const SESSION_EXPIRY_DAYS: i64 = 7;

/// Most sessions held in memory at once.
pub const MAX_SESSIONS: u64 = 100_000;

/// Create the session layer backed by [`MokaStore`].
///
/// The cookie is marked `Secure` when the storefront is served over HTTPS.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(MokaStore::new(Some(MAX_SESSIONS)))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::days(SESSION_EXPIRY_DAYS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
