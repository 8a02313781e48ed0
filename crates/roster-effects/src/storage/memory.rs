//! In-memory session store handler

use async_trait::async_trait;
use roster_core::effects::SessionStoreEffects;
use roster_core::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session store, used by tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Copy of every entry, for assertions
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl SessionStoreEffects for MemorySessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut data = self.data.write().await;
        data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::effects::{SessionStoreExt, StoreKey};
    use roster_core::{Profile, RoleAssignment};

    #[tokio::test]
    async fn get_set_remove() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get_item("token").await.unwrap(), None);

        store.set_item("token", "abc".into()).await.unwrap();
        assert_eq!(store.get_item("token").await.unwrap().as_deref(), Some("abc"));

        store.remove_item("token").await.unwrap();
        store.remove_item("token").await.unwrap();
        assert_eq!(store.get_item("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrapped_token_is_normalized_on_read_and_rewritten_raw() {
        let store = MemorySessionStore::with_entries([("token", r#"{"token":"abc"}"#)]);
        let token = store.load_token().await.unwrap().unwrap();
        assert_eq!(token.expose(), "abc");

        store.store_token(&token).await.unwrap();
        assert_eq!(store.get_item("token").await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn clear_session_removes_every_session_key_only() {
        let store = MemorySessionStore::with_entries([
            ("token", "abc"),
            ("user", "{}"),
            ("activeUnitId", "A"),
            ("apiBaseUrl", "https://x.test"),
            ("onboardingSeen", "true"),
        ]);

        store.clear_session().await.unwrap();

        let remaining = store.snapshot().await;
        for key in StoreKey::SESSION_KEYS {
            assert!(!remaining.contains_key(key.as_str()), "{key} survived");
        }
        assert_eq!(remaining.get("onboardingSeen").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn profile_and_unit_helpers() {
        let store = MemorySessionStore::new();
        let profile = Profile::new("u-1", "Member", vec![RoleAssignment::scoped("Member", "A")]);

        store.store_profile(&profile).await.unwrap();
        assert_eq!(store.load_profile().await.unwrap(), Some(profile));

        store.set_active_unit_id(Some("A")).await.unwrap();
        assert_eq!(store.active_unit_id().await.unwrap().as_deref(), Some("A"));
        store.set_active_unit_id(None).await.unwrap();
        assert_eq!(store.active_unit_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_cached_profile_is_a_serialization_error() {
        let store = MemorySessionStore::with_entries([("user", "not json")]);
        let err = store.load_profile().await.unwrap_err();
        assert!(matches!(err, roster_core::RosterError::Serialization { .. }));
    }
}
