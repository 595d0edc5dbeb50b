//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per request)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID
//! 4. Security headers
//! 5. Offline cache (cache-first with offline fallback)
//! 6. Session layer (tower-sessions memory store)
//! 7. Rate limiting on the newsletter and `/api` routes

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use rate_limit::{api_rate_limiter, lead_rate_limiter};
pub use request_id::{RequestId, request_id_middleware, trace_layer};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
