use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use super::KeyValueStorage;
use crate::errors::ServiceError;

/// Directory-backed storage: each key is persisted as `<root>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Initialize the storage under `root`, creating the directory if missing.
    pub async fn new<P: Into<PathBuf>>(root: P) -> Result<Arc<Self>, ServiceError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Arc::new(Self { root }))
    }

    pub fn root(&self) -> &Path { &self.root }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ServiceError::Storage(format!("invalid storage key `{key}`")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        // write-then-rename so the old value stays intact if the write fails
        let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        if let Err(e) = write_synced(&tmp, value.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::rename(&tmp, &path).await?;
        debug!(key, bytes = value.len(), "storage item written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
