//! Klaviyo API client for lead capture.
//!
//! Subscribes captured emails to the configured list with marketing consent.

use panel_labels_core::Email;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::KlaviyoConfig;

/// Klaviyo API version.
const API_REVISION: &str = "2024-10-15";

/// Klaviyo API base URL.
const BASE_URL: &str = "https://a.klaviyo.com/api";

/// Errors that can occur when interacting with Klaviyo API.
#[derive(Debug, Error)]
pub enum KlaviyoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Outcome of a subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

/// Klaviyo API client.
#[derive(Clone)]
pub struct KlaviyoClient {
    client: reqwest::Client,
    base_url: String,
    list_id: String,
}

impl KlaviyoClient {
    /// Create a new Klaviyo API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &KlaviyoConfig) -> Result<Self, KlaviyoError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Klaviyo-API-Key {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| KlaviyoError::Config(format!("Invalid API key format: {e}")))?,
        );
        headers.insert("revision", HeaderValue::from_static(API_REVISION));
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/vnd.api+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            list_id: config.list_id.clone(),
        })
    }

    /// Point the client at a different API host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Subscribe an email to the list.
    ///
    /// Klaviyo answers a bulk subscription job with `202 Accepted`. A
    /// `409 Conflict` means the profile is already on the list and is reported
    /// as [`SubscribeOutcome::AlreadySubscribed`].
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn subscribe(
        &self,
        email: &Email,
        source: &str,
    ) -> Result<SubscribeOutcome, KlaviyoError> {
        let url = format!("{}/profile-subscription-bulk-create-jobs", self.base_url);
        let body = subscription_body(email, source, &self.list_id);

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::CONFLICT {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlaviyoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(SubscribeOutcome::Subscribed)
    }
}

fn subscription_body(email: &Email, source: &str, list_id: &str) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "type": "profile-subscription-bulk-create-job",
            "attributes": {
                "custom_source": format!("Panel Labels Website ({source})"),
                "profiles": {
                    "data": [{
                        "type": "profile",
                        "attributes": {
                            "email": email.as_str(),
                            "subscriptions": {
                                "email": {
                                    "marketing": {
                                        "consent": "SUBSCRIBED"
                                    }
                                }
                            }
                        }
                    }]
                }
            },
            "relationships": {
                "list": {
                    "data": {
                        "type": "list",
                        "id": list_id
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_body() {
        let email = Email::parse("Installer@Example.com").unwrap();
        let body = subscription_body(&email, "home", "LIST1");
        let profile = &body["data"]["attributes"]["profiles"]["data"][0]["attributes"];
        assert_eq!(profile["email"], "installer@example.com");
        assert_eq!(
            body["data"]["attributes"]["custom_source"],
            "Panel Labels Website (home)"
        );
        assert_eq!(body["data"]["relationships"]["list"]["data"]["id"], "LIST1");
    }
}
