//! Object storage for originals and derived images.

mod memory;
mod s3;

use async_trait::async_trait;

pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object {key} is {size} bytes, limit is {limit}")]
    TooLarge { key: String, size: u64, limit: u64 },

    #[error("storage transport failure: {0}")]
    Transport(String),
}

/// Key/value object store. Keys are used verbatim.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}
