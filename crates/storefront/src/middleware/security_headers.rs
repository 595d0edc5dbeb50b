//! Security headers middleware.
//!
//! The content security policy admits exactly the third parties the
//! storefront loads: htmx from unpkg, Google Analytics / Ads through gtag,
//! and the Meta pixel.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content security policy for every response.
pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
     script-src 'self' https://unpkg.com https://www.googletagmanager.com https://connect.facebook.net; \
     style-src 'self'; \
     img-src 'self' data: https://www.google-analytics.com https://www.googletagmanager.com https://www.facebook.com; \
     connect-src 'self' https://www.google-analytics.com https://*.analytics.google.com https://www.facebook.com; \
     font-src 'self'; \
     frame-src 'none'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'";

const PERMISSIONS_POLICY: &str = "camera=(), geolocation=(), microphone=(), payment=(), usb=()";

/// Cache policy for fingerprinted static assets.
const STATIC_CACHE_CONTROL: &str = "public, max-age=604800";

/// Cache policy for everything else unless the handler chose one.
const DEFAULT_CACHE_CONTROL: &str = "no-cache";

/// Add security headers to all responses.
///
/// `Strict-Transport-Security` is only sent for requests that arrived over
/// HTTPS at the edge (`x-forwarded-proto: https`).
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let is_https = request
        .headers()
        .get("x-forwarded-proto")
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"https"));

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    if is_https {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    if !headers.contains_key(CACHE_CONTROL) {
        let policy = if is_static {
            STATIC_CACHE_CONTROL
        } else {
            DEFAULT_CACHE_CONTROL
        };
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(policy));
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "home" }))
            .route("/static/app.js", get(|| async { "js" }))
            .route(
                "/private",
                get(|| async { ([(CACHE_CONTROL, "no-store")], "secret") }),
            )
            .layer(from_fn(security_headers_middleware))
    }

    async fn get_headers(path: &str, https: bool) -> axum::http::HeaderMap {
        let mut builder = Request::get(path);
        if https {
            builder = builder.header("x-forwarded-proto", "https");
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_policy_headers_present() {
        let headers = get_headers("/", false).await;
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let csp = headers[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("https://www.googletagmanager.com"));
        assert!(csp.contains("https://connect.facebook.net"));
        assert!(!headers.contains_key(STRICT_TRANSPORT_SECURITY));
        assert!(get_headers("/", true).await.contains_key(STRICT_TRANSPORT_SECURITY));
    }

    #[tokio::test]
    async fn test_cache_control_defaults_respect_handler() {
        assert_eq!(get_headers("/", false).await[CACHE_CONTROL], DEFAULT_CACHE_CONTROL);
        assert_eq!(
            get_headers("/static/app.js", false).await[CACHE_CONTROL],
            STATIC_CACHE_CONTROL
        );
        assert_eq!(get_headers("/private", false).await[CACHE_CONTROL], "no-store");
    }
}
