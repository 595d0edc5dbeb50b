//! Versioned envelope for persisted state snapshots.
//!
//! Stored as `{"state": <T>, "version": <u32>}`. A reader only accepts the
//! version it was built for; anything else is reported as
//! [`PersistError::VersionMismatch`] so the caller can fall back to a fresh
//! state.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Storage key for the cart snapshot.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Current version of the cart snapshot layout.
pub const CART_STORAGE_VERSION: u32 = 1;

/// Errors reading or writing a persisted snapshot.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("snapshot version {found} does not match expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A state value tagged with the layout version it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState<T> {
    pub state: T,
    pub version: u32,
}

impl<T> PersistedState<T> {
    #[must_use]
    pub const fn new(state: T, version: u32) -> Self {
        Self { state, version }
    }
}

impl<T: Serialize> PersistedState<T> {
    /// Serialize the envelope to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` fails to serialize.
    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> PersistedState<T> {
    /// Parse an envelope and check its version.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid envelope or carries a
    /// different version.
    pub fn decode(raw: &str, expected_version: u32) -> Result<T, PersistError> {
        // Peek at the version first so an old layout is reported as a
        // mismatch rather than a parse failure.
        #[derive(Deserialize)]
        struct VersionOnly {
            version: u32,
        }

        let VersionOnly { version } = serde_json::from_str(raw)?;
        if version != expected_version {
            return Err(PersistError::VersionMismatch {
                expected: expected_version,
                found: version,
            });
        }

        let envelope: Self = serde_json::from_str(raw)?;
        Ok(envelope.state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartState;

    #[test]
    fn test_decode_current_version() {
        let cart = CartState::new();
        let raw = PersistedState::new(&cart, CART_STORAGE_VERSION)
            .encode()
            .unwrap();
        assert!(raw.contains("\"version\":1"));

        let decoded: CartState = PersistedState::decode(&raw, CART_STORAGE_VERSION).unwrap();
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_decode_old_layout_is_version_mismatch() {
        // Version 0 stored bare product ids with no cart id
        let raw = r#"{"state":{"items":[{"id":1,"qty":2}]},"version":0}"#;
        let err = PersistedState::<CartState>::decode(raw, CART_STORAGE_VERSION).unwrap_err();
        assert!(matches!(
            err,
            PersistError::VersionMismatch {
                expected: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn test_decode_garbage_is_json_error() {
        let err = PersistedState::<CartState>::decode("not json", 1).unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }
}
