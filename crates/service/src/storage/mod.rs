//! Storage abstractions for service layer
//!
//! A string key-value port shaped like browser local storage, two backends
//! for it, and a typed JSON document that stores load and rewrite wholesale.

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod file;
pub mod json_document;
pub mod memory;

pub use file::FileStorage;
pub use json_document::JsonDocument;
pub use memory::MemoryStorage;

/// Persistent string key-value storage.
/// Implementations must replace a value as a whole; readers never see a partial write.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set_item(&self, key: &str, value: String) -> Result<(), ServiceError>;
    /// Remove a key; returns whether it existed.
    async fn remove_item(&self, key: &str) -> Result<bool, ServiceError>;
}
