//! Which requests the offline cache may answer.

use std::sync::LazyLock;

use regex::RegexSet;

/// Path prefixes that always go to the network.
pub const BYPASS_PREFIXES: &[&str] = &["/cart", "/checkout", "/api/", "/newsletter", "/health"];

/// Paths whose cached copy is refreshed in the background after a hit.
pub const DYNAMIC_PATTERNS: &[&str] = &[r"^/$", r"^/products", r"^/faq", r"^/how-it-works"];

static DYNAMIC_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(DYNAMIC_PATTERNS).expect("Invalid regex"));

/// Returns true when `path` must never be served from cache.
///
/// A prefix ending in `/` matches anything below it; any other prefix matches
/// the path itself and its sub-paths (`/cart`, `/cart/add`, not `/cartoon`).
#[must_use]
pub fn is_bypassed(path: &str) -> bool {
    BYPASS_PREFIXES.iter().any(|prefix| {
        if prefix.ends_with('/') {
            path.starts_with(prefix)
        } else {
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        }
    })
}

/// Returns true when a cache hit for `path` should trigger a refresh.
#[must_use]
pub fn is_dynamic(path: &str) -> bool {
    DYNAMIC_SET.is_match(path)
}
