//! JSON file session store handler
//!
//! All keys live in one JSON object on disk. Every mutation rewrites the file
//! through a temporary sibling followed by a rename, so a crash mid-write
//! leaves the previous snapshot intact.

use async_trait::async_trait;
use roster_core::effects::SessionStoreEffects;
use roster_core::{Result, RosterError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

/// Session store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cache: Mutex<Option<Entries>>,
}

impl FileSessionStore {
    /// Store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                RosterError::serialization(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(RosterError::storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), keys = entries.len(), "session store flushed");
        Ok(())
    }

    /// Apply `mutate` to a copy of the entries and flush if anything changed.
    ///
    /// The cache only takes the new entries once they are on disk, so a failed
    /// write leaves reads agreeing with the file.
    async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> bool + Send,
    {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_entries().await?);
        }
        let Some(entries) = cache.as_ref() else {
            return Err(RosterError::internal("session store cache not loaded"));
        };
        let mut next = entries.clone();
        if mutate(&mut next) {
            self.write_entries(&next).await?;
            *cache = Some(next);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStoreEffects for FileSessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_entries().await?);
        }
        Ok(cache.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.update(|entries| entries.insert(key.to_owned(), value.clone()).as_ref() != Some(&value))
            .await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some()).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        self.update(|entries| {
            keys.iter()
                .fold(false, |changed, key| entries.remove(*key).is_some() || changed)
        })
        .await
    }
}
