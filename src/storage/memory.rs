use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::storage::{ObjectStore, StorageError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process [`ObjectStore`], for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored object under `key`, if any.
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) {
        self.lock().insert(
            key.into(),
            StoredObject {
                bytes,
                content_type: content_type.into(),
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredObject>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(key)
            .map(|object| object.bytes)
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }

    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.insert(key, bytes, content_type);
        Ok(())
    }
}
