//! Session store effects.
//!
//! The store holds serialized snapshots only; the in-memory session and role
//! switch state stay authoritative. No cross-key transactionality is offered.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, RosterError};
use crate::token::AuthToken;
use crate::types::Profile;

/// Keys the core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Auth credential
    Token,
    /// Serialized [`Profile`]
    User,
    /// Unit id of the active role assignment
    ActiveUnitId,
    /// Per-user API base URL override
    BaseUrlOverride,
}

impl StoreKey {
    /// Every key cleared when the session is invalidated.
    pub const SESSION_KEYS: [StoreKey; 4] = [
        StoreKey::Token,
        StoreKey::User,
        StoreKey::ActiveUnitId,
        StoreKey::BaseUrlOverride,
    ];

    /// Storage key string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::User => "user",
            Self::ActiveUnitId => "activeUnitId",
            Self::BaseUrlOverride => "apiBaseUrl",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value persistence consumed by the core.
#[async_trait]
pub trait SessionStoreEffects: Send + Sync {
    /// Read a value, `None` when absent.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Remove a value. Removing an absent key succeeds.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Remove several values.
    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove_item(key).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: SessionStoreEffects + ?Sized> SessionStoreEffects for Arc<T> {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        (**self).set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        (**self).multi_remove(keys).await
    }
}

/// Typed access to the session keys.
///
/// Blanket-implemented for every store, so token normalization and profile
/// (de)serialization happen here and nowhere else.
#[async_trait]
pub trait SessionStoreExt: SessionStoreEffects {
    /// Stored token in either accepted shape, normalized.
    async fn load_token(&self) -> Result<Option<AuthToken>> {
        Ok(self
            .get_item(StoreKey::Token.as_str())
            .await?
            .and_then(|raw| AuthToken::from_stored(&raw)))
    }

    /// Persist a token as a raw credential.
    async fn store_token(&self, token: &AuthToken) -> Result<()> {
        self.set_item(StoreKey::Token.as_str(), token.expose().to_owned())
            .await
    }

    /// Cached profile snapshot.
    async fn load_profile(&self) -> Result<Option<Profile>> {
        match self.get_item(StoreKey::User.as_str()).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| RosterError::serialization(format!("cached profile: {e}"))),
            None => Ok(None),
        }
    }

    /// Replace the cached profile snapshot.
    async fn store_profile(&self, profile: &Profile) -> Result<()> {
        let raw = serde_json::to_string(profile)?;
        self.set_item(StoreKey::User.as_str(), raw).await
    }

    /// Unit id of the active assignment.
    async fn active_unit_id(&self) -> Result<Option<String>> {
        Ok(self
            .get_item(StoreKey::ActiveUnitId.as_str())
            .await?
            .filter(|id| !id.is_empty()))
    }

    /// Set the active unit id, or remove it for global roles.
    async fn set_active_unit_id(&self, unit_id: Option<&str>) -> Result<()> {
        match unit_id {
            Some(id) => {
                self.set_item(StoreKey::ActiveUnitId.as_str(), id.to_owned())
                    .await
            }
            None => self.remove_item(StoreKey::ActiveUnitId.as_str()).await,
        }
    }

    /// Remove every session key.
    async fn clear_session(&self) -> Result<()> {
        let keys = StoreKey::SESSION_KEYS.map(|key| key.as_str());
        self.multi_remove(&keys).await
    }
}

impl<S: SessionStoreEffects + ?Sized> SessionStoreExt for S {}
