//! In-memory secure store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::SecureStore;
use crate::error::Error;

/// Process-local store. Contents are lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn store(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        self.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_retrieve_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.store("key", b"value").await.unwrap();
        assert_eq!(store.retrieve("key").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);

        store.remove("key").await.unwrap();
        assert_eq!(store.retrieve("key").await.unwrap(), None);
    }
}
