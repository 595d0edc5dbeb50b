//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CONTENT_DIR` - Markdown pages (default: crates/storefront/content)
//! - `STOREFRONT_STATIC_DIR` - Static assets (default: crates/storefront/static)
//! - `CHECKOUT_URL` - Hosted checkout to hand carts off to
//! - `GA4_MEASUREMENT_ID` - Google Analytics 4 measurement ID
//! - `GA4_API_SECRET` - GA4 Measurement Protocol secret (server-side events)
//! - `GA4_COLLECT_URL` - Measurement Protocol endpoint (default: Google's collector)
//! - `META_PIXEL_ID` - Meta (Facebook) pixel ID
//! - `GOOGLE_ADS_ID` - Google Ads conversion ID
//! - `GOOGLE_ADS_CONVERSION_LABEL` - Google Ads conversion label
//! - `KLAVIYO_PRIVATE_API_KEY` / `KLAVIYO_LIST_ID` - Lead capture list
//! - `OFFLINE_CACHE_VERSION` - Cache name suffix (default: v1)
//! - `OFFLINE_CACHE_TTL_SECS` - Cached response lifetime (default: 300)
//! - `OFFLINE_FETCH_TIMEOUT_SECS` - Network timeout before falling back (default: 10)
//! - `OFFLINE_SYNC_ENABLED` - Background sync on/off (default: true)
//! - `OFFLINE_SYNC_ENDPOINT` - Base URL for sync posts (default: base URL)
//! - `OFFLINE_SYNC_INTERVAL_SECS` - Sync retry interval (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Directory holding markdown content pages
    pub content_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Hosted checkout URL; without it `/checkout` renders a summary page
    pub checkout_url: Option<Url>,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Klaviyo configuration (optional, leads are logged without it)
    pub klaviyo: Option<KlaviyoConfig>,
    /// Offline cache and background sync settings
    pub offline: OfflineConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Analytics and tracking pixel configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Google Analytics 4 measurement ID
    pub ga4_measurement_id: Option<String>,
    /// GA4 Measurement Protocol API secret (server-side only)
    pub ga4_api_secret: Option<SecretString>,
    /// Measurement Protocol endpoint override
    pub ga4_collect_url: Option<String>,
    /// Meta (Facebook) pixel ID
    pub meta_pixel_id: Option<String>,
    /// Google Ads conversion ID
    pub google_ads_id: Option<String>,
    /// Google Ads conversion label
    pub google_ads_conversion_label: Option<String>,
}

impl AnalyticsConfig {
    /// Returns true when server-side events can be delivered to GA4.
    #[must_use]
    pub const fn server_side_enabled(&self) -> bool {
        self.ga4_measurement_id.is_some() && self.ga4_api_secret.is_some()
    }
}

/// Klaviyo API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct KlaviyoConfig {
    /// Private API key
    pub api_key: SecretString,
    /// List that captured leads are subscribed to
    pub list_id: String,
}

impl std::fmt::Debug for KlaviyoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaviyoConfig")
            .field("api_key", &"[REDACTED]")
            .field("list_id", &self.list_id)
            .finish()
    }
}

/// Offline cache and background sync settings.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Suffix of the active cache name (`panel-labels-{version}`)
    pub cache_version: String,
    /// How long a cached response stays valid
    pub cache_ttl: Duration,
    /// Time allowed for the network before falling back to offline content
    pub fetch_timeout: Duration,
    /// Whether cart/analytics queues are synced at all
    pub sync_enabled: bool,
    /// Base URL the sync endpoints are posted to
    pub sync_endpoint: Url,
    /// Interval between sync attempts for registered tags
    pub sync_interval: Duration,
}

impl OfflineConfig {
    /// Defaults for a given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn with_defaults(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            cache_version: "v1".to_string(),
            cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            sync_enabled: true,
            sync_endpoint: parse_url("STOREFRONT_BASE_URL", base_url)?,
            sync_interval: Duration::from_secs(30),
        })
    }

    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let defaults = Self::with_defaults(base_url)?;
        let sync_endpoint = match get_optional_env("OFFLINE_SYNC_ENDPOINT") {
            Some(raw) => parse_url("OFFLINE_SYNC_ENDPOINT", &raw)?,
            None => defaults.sync_endpoint,
        };

        Ok(Self {
            cache_version: get_env_or_default("OFFLINE_CACHE_VERSION", &defaults.cache_version),
            cache_ttl: get_duration_secs("OFFLINE_CACHE_TTL_SECS", defaults.cache_ttl)?,
            fetch_timeout: get_duration_secs("OFFLINE_FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?,
            sync_enabled: get_bool("OFFLINE_SYNC_ENABLED", defaults.sync_enabled)?,
            sync_endpoint,
            sync_interval: get_duration_secs("OFFLINE_SYNC_INTERVAL_SECS", defaults.sync_interval)?,
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        parse_url("STOREFRONT_BASE_URL", &base_url)?;

        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let checkout_url = get_optional_env("CHECKOUT_URL")
            .map(|raw| parse_url("CHECKOUT_URL", &raw))
            .transpose()?;

        let offline = OfflineConfig::from_env(&base_url)?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            content_dir: get_env_or_default("STOREFRONT_CONTENT_DIR", "crates/storefront/content")
                .into(),
            static_dir: get_env_or_default("STOREFRONT_STATIC_DIR", "crates/storefront/static")
                .into(),
            checkout_url,
            analytics: AnalyticsConfig::from_env(),
            klaviyo: KlaviyoConfig::from_env()?,
            offline,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL for a site path.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Returns true when serving over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl AnalyticsConfig {
    fn from_env() -> Self {
        Self {
            ga4_measurement_id: get_optional_env("GA4_MEASUREMENT_ID"),
            ga4_api_secret: get_optional_env("GA4_API_SECRET").map(SecretString::from),
            ga4_collect_url: get_optional_env("GA4_COLLECT_URL"),
            meta_pixel_id: get_optional_env("META_PIXEL_ID"),
            google_ads_id: get_optional_env("GOOGLE_ADS_ID"),
            google_ads_conversion_label: get_optional_env("GOOGLE_ADS_CONVERSION_LABEL"),
        }
    }
}

impl KlaviyoConfig {
    /// Both variables must be present together; one without the other is
    /// almost certainly a deployment mistake.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("KLAVIYO_PRIVATE_API_KEY"),
            get_optional_env("KLAVIYO_LIST_ID"),
        ) {
            (Some(api_key), Some(list_id)) => Ok(Some(Self {
                api_key: SecretString::from(api_key),
                list_id,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("KLAVIYO_LIST_ID".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(
                "KLAVIYO_PRIVATE_API_KEY".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds as a `Duration`.
fn get_duration_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn get_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_bool(key, &raw))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Configuration for tests and tools that build the app without an
/// environment.
#[doc(hidden)]
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn test_config(base_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: base_url.trim_end_matches('/').to_string(),
        session_secret: SecretString::from("k7#Qz!9mP2@vL5$wX8^rT1&yB4*nC6%d"),
        content_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/content")),
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        checkout_url: None,
        analytics: AnalyticsConfig::default(),
        klaviyo: None,
        #[allow(clippy::expect_used)]
        offline: OfflineConfig::with_defaults(base_url).expect("test base URL must be valid"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_test_config_secret_passes_validation() {
        let config = test_config("http://localhost:3000/");
        let secret = config.session_secret.expose_secret();
        assert!(validate_secret_strength(secret, "TEST").is_ok());
        assert!(validate_session_secret(&config.session_secret, "TEST").is_ok());
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_absolute_url() {
        let config = test_config("https://labels.test");
        assert_eq!(config.absolute_url("/products"), "https://labels.test/products");
        assert_eq!(config.absolute_url("faq"), "https://labels.test/faq");
        assert!(config.is_secure());
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config("http://localhost:3000");
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_klaviyo_config_debug_redacts_key() {
        let config = KlaviyoConfig {
            api_key: SecretString::from("pk_super_secret_value"),
            list_id: "LIST123".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("LIST123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pk_super_secret_value"));
    }
}
