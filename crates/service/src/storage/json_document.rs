use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::error;

use super::KeyValueStorage;
use crate::errors::ServiceError;

/// A typed value mirrored to a single storage key as JSON.
///
/// The whole value is loaded once and rewritten on every mutation. Mutations run
/// against a draft under the write lock; the in-memory value is only replaced
/// after the storage write succeeds, so a failed write leaves it untouched.
pub struct JsonDocument<T> {
    inner: RwLock<T>,
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync,
{
    /// Load the document from `key`. A missing entry yields `T::default()`.
    ///
    /// An entry that does not parse is an error and is left in storage as is.
    pub async fn load(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Result<Self, ServiceError> {
        let key = key.into();
        let value = match storage.get_item(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                error!(%key, error = %e, "stored document is unreadable");
                ServiceError::Storage(format!("stored entry `{key}` is unreadable: {e}"))
            })?,
            None => T::default(),
        };
        Ok(Self { inner: RwLock::new(value), storage, key })
    }

    pub fn key(&self) -> &str { &self.key }

    /// Run a read-only projection over the current value.
    pub async fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R + Send,
    {
        let guard = self.inner.read().await;
        f(&guard)
    }

    pub async fn snapshot(&self) -> T {
        self.inner.read().await.clone()
    }

    /// Apply a mutation and persist the whole value.
    pub async fn update<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut T) -> Result<R, ServiceError> + Send,
        R: Send,
    {
        let mut guard = self.inner.write().await;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        let data = serde_json::to_string(&draft)?;
        self.storage.set_item(&self.key, data).await?;
        *guard = draft;
        Ok(out)
    }

    /// Reset to the default value and drop the stored entry; returns whether it existed.
    pub async fn clear(&self) -> Result<bool, ServiceError> {
        let mut guard = self.inner.write().await;
        let existed = self.storage.remove_item(&self.key).await?;
        *guard = T::default();
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn update_persists_and_reloads() -> Result<(), anyhow::Error> {
        let storage = Arc::new(MemoryStorage::new());
        let doc = JsonDocument::<Vec<String>>::load(storage.clone(), "names").await?;
        assert!(doc.snapshot().await.is_empty());

        let len = doc.update(|v| { v.push("a".into()); v.push("b".into()); Ok(v.len()) }).await?;
        assert_eq!(len, 2);

        let reloaded = JsonDocument::<Vec<String>>::load(storage.clone(), "names").await?;
        assert_eq!(reloaded.snapshot().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reloaded.read(|v| v.first().cloned()).await.as_deref(), Some("a"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_mutation_or_write_leaves_value_untouched() -> Result<(), anyhow::Error> {
        let storage = Arc::new(MemoryStorage::new());
        let doc = JsonDocument::<BTreeMap<String, u8>>::load(storage.clone(), "scores").await?;
        doc.update(|m| { m.insert("zelda".into(), 5); Ok(()) }).await?;

        let rejected = doc
            .update(|m| {
                m.insert("cyberpunk".into(), 1);
                Err::<(), _>(ServiceError::validation("nope"))
            })
            .await;
        assert!(matches!(rejected, Err(ServiceError::Validation(_))));
        assert_eq!(doc.snapshot().await.len(), 1);

        storage.fail_writes(true);
        assert!(doc.update(|m| { m.clear(); Ok(()) }).await.is_err());
        assert_eq!(doc.snapshot().await.get("zelda"), Some(&5));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_entry_fails_load_and_is_kept() -> Result<(), anyhow::Error> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("names", "{not json".into()).await?;
        let loaded = JsonDocument::<Vec<String>>::load(storage.clone(), "names").await;
        assert!(matches!(loaded, Err(ServiceError::Storage(_))));
        assert_eq!(storage.get_item("names").await?.as_deref(), Some("{not json"));
        Ok(())
    }

    #[tokio::test]
    async fn clear_removes_entry() -> Result<(), anyhow::Error> {
        let storage = Arc::new(MemoryStorage::new());
        let doc = JsonDocument::<Option<String>>::load(storage.clone(), "current").await?;
        doc.update(|s| { *s = Some("bob".into()); Ok(()) }).await?;
        assert!(storage.get_item("current").await?.is_some());

        assert!(doc.clear().await?);
        assert!(!doc.clear().await?);
        assert_eq!(doc.snapshot().await, None);
        assert_eq!(storage.get_item("current").await?, None);
        Ok(())
    }
}
