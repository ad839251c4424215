use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::KeyValueStorage;
use crate::errors::ServiceError;

/// In-process storage for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    /// Make every subsequent `set_item`/`remove_item` fail, to exercise error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("storage is read-only".into()));
        }
        Ok(())
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, ServiceError> {
        self.items.lock().map_err(|_| ServiceError::Storage("memory storage poisoned".into()))
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.items()?.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.check_writable()?;
        self.items()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError> {
        self.check_writable()?;
        Ok(self.items()?.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_basic_crud() -> Result<(), anyhow::Error> {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v".into()).await?;
        assert_eq!(storage.get_item("k").await?.as_deref(), Some("v"));

        storage.fail_writes(true);
        assert!(storage.set_item("k", "w".into()).await.is_err());
        assert!(storage.remove_item("k").await.is_err());
        assert_eq!(storage.get_item("k").await?.as_deref(), Some("v"));

        storage.fail_writes(false);
        assert!(storage.remove_item("k").await?);
        assert_eq!(storage.get_item("k").await?, None);
        Ok(())
    }
}
