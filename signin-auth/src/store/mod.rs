//! Best-effort local credential cache.
//!
//! Used to remember the profile a provider only reveals on first consent.
//! Nothing in the sign-in flow depends on these calls succeeding.

pub mod encryption;
mod file;
mod memory;

pub use file::EncryptedFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, ErrorKind, StoreErrorKind};
use crate::oauth::PersonName;

/// Service name records are filed under by default.
pub const DEFAULT_SERVICE: &str = "signin-exchange";

/// Trait for secure byte stores keyed by string.
///
/// Implementations should:
/// - Encrypt data at rest
/// - Replace existing data on `store`
/// - Treat removing a missing key as success
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store data under a key, replacing any existing value.
    async fn store(&self, key: &str, data: &[u8]) -> Result<(), Error>;

    /// Retrieve data for a key.
    ///
    /// # Returns
    ///
    /// `Some(data)` if found, `None` if not found.
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Remove data for a key.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Profile captured on first consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub email: String,
    pub name: PersonName,
    /// Provider's stable user identifier.
    pub identifier: String,
}

/// Typed records on top of a [`SecureStore`], filed as `service/account`.
pub struct RecordStore<S: SecureStore> {
    store: S,
    service: String,
}

impl<S: SecureStore> RecordStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_service(store, DEFAULT_SERVICE)
    }

    pub fn with_service(store: S, service: &str) -> Self {
        Self {
            store,
            service: service.to_string(),
        }
    }

    fn key(&self, account: &str) -> String {
        format!("{}/{}", self.service, account)
    }

    /// Serialize and store a record for an account.
    pub async fn store<T: Serialize + Sync>(&self, account: &str, record: &T) -> Result<(), Error> {
        let data = serde_json::to_vec(record)?;
        self.store.store(&self.key(account), &data).await
    }

    /// Retrieve and deserialize the record for an account.
    pub async fn retrieve<T: DeserializeOwned>(&self, account: &str) -> Result<Option<T>, Error> {
        match self.store.retrieve(&self.key(account)).await? {
            Some(data) => serde_json::from_slice(&data).map(Some).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Store(StoreErrorKind::BadData),
            }),
            None => Ok(None),
        }
    }

    /// Remove the record for an account.
    pub async fn remove(&self, account: &str) -> Result<(), Error> {
        self.store.remove(&self.key(account)).await
    }

    /// Get the underlying store.
    pub fn inner(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserData {
        UserData {
            email: "jane@privaterelay.appleid.com".to_string(),
            name: PersonName {
                given_name: Some("Jane".to_string()),
                family_name: Some("Appleseed".to_string()),
            },
            identifier: "001234.abcdef".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_store_replaces_existing_record() {
        let records = RecordStore::new(MemoryStore::new());
        records.store("001234.abcdef", &user()).await.unwrap();

        let mut updated = user();
        updated.email = "jane@example.com".to_string();
        records.store("001234.abcdef", &updated).await.unwrap();

        let retrieved: Option<UserData> = records.retrieve("001234.abcdef").await.unwrap();
        assert_eq!(retrieved, Some(updated));
    }

    #[tokio::test]
    async fn test_record_store_missing_account() {
        let records = RecordStore::new(MemoryStore::new());
        let retrieved: Option<UserData> = records.retrieve("nobody").await.unwrap();
        assert!(retrieved.is_none());
    }

    #[tokio::test]
    async fn test_record_store_remove() {
        let records = RecordStore::new(MemoryStore::new());
        records.store("001234.abcdef", &user()).await.unwrap();
        records.remove("001234.abcdef").await.unwrap();
        records.remove("001234.abcdef").await.unwrap();

        let retrieved: Option<UserData> = records.retrieve("001234.abcdef").await.unwrap();
        assert!(retrieved.is_none());
    }

    #[tokio::test]
    async fn test_record_store_bad_data() {
        let store = MemoryStore::new();
        store
            .store("signin-exchange/001234.abcdef", b"not json")
            .await
            .unwrap();
        let records = RecordStore::new(store);

        let err = records
            .retrieve::<UserData>("001234.abcdef")
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Store(StoreErrorKind::BadData));
    }

    #[tokio::test]
    async fn test_records_are_namespaced_by_service() {
        let records = RecordStore::with_service(MemoryStore::new(), "other-app");
        records.store("001234.abcdef", &user()).await.unwrap();

        assert!(records
            .inner()
            .retrieve("other-app/001234.abcdef")
            .await
            .unwrap()
            .is_some());
    }
}
