//! Auth token normalization at the session store boundary.
//!
//! The `token` key has been written both as a raw credential and as a JSON
//! object `{"token": "..."}`. Reads accept either shape; writes always store
//! the raw credential, so nothing downstream ever re-parses it.

use serde_json::Value;
use std::fmt;

/// Bearer credential for the auth gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a credential. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Normalize a stored value of either shape.
    pub fn from_stored(stored: &str) -> Option<Self> {
        let trimmed = stored.trim();
        if trimmed.starts_with('{') {
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => map
                    .get("token")
                    .and_then(Value::as_str)
                    .and_then(Self::new),
                _ => None,
            };
        }
        // A JSON string literal is also tolerated.
        if trimmed.starts_with('"') {
            return serde_json::from_str::<String>(trimmed)
                .ok()
                .and_then(Self::new);
        }
        Self::new(trimmed)
    }

    /// The raw credential, as written to the store and sent to the gateway.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
