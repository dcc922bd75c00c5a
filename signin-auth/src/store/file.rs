//! Encrypted on-disk secure store.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{encryption, SecureStore};
use crate::error::Error;

/// Stores each key as one AES-256-GCM encrypted file in a directory.
///
/// File names are the hex SHA-256 of the key, so keys never appear on disk.
pub struct EncryptedFileStore {
    dir: PathBuf,
    key: [u8; 32],
}

impl EncryptedFileStore {
    /// Create a store rooted at `dir` using a 64 character hex key.
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, key_hex: &str) -> Result<Self, Error> {
        Ok(Self {
            dir: dir.into(),
            key: encryption::parse_key(key_hex)?,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.enc", hex::encode(digest)))
    }
}

#[async_trait]
impl SecureStore for EncryptedFileStore {
    async fn store(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let staging = path.with_extension("tmp");
        let encrypted = encryption::encrypt(data, &self.key)?;

        tokio::fs::write(&staging, encrypted).await?;
        tokio::fs::rename(&staging, &path).await?;

        debug!("Stored secure record at {}", path.display());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let encrypted = match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        encryption::decrypt(&encrypted, &self.key).map(Some)
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StoreErrorKind};

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const OTHER_KEY: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(dir.path().join("records"), TEST_KEY).unwrap();

        store.store("signin-exchange/user", b"payload").await.unwrap();
        assert_eq!(
            store.retrieve("signin-exchange/user").await.unwrap(),
            Some(b"payload".to_vec())
        );
    }

    #[tokio::test]
    async fn test_file_contents_are_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(dir.path(), TEST_KEY).unwrap();

        store.store("user", b"jane@example.com").await.unwrap();
        let on_disk = std::fs::read_to_string(store.path_for("user")).unwrap();
        assert!(!on_disk.contains("jane@example.com"));
    }

    #[tokio::test]
    async fn test_missing_key_retrieves_none_and_removes_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(dir.path(), TEST_KEY).unwrap();

        assert_eq!(store.retrieve("missing").await.unwrap(), None);
        store.remove("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_key_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        EncryptedFileStore::new(dir.path(), TEST_KEY)
            .unwrap()
            .store("user", b"payload")
            .await
            .unwrap();

        let other = EncryptedFileStore::new(dir.path(), OTHER_KEY).unwrap();
        let err = other.retrieve("user").await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Store(StoreErrorKind::DecryptionFailed)
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = EncryptedFileStore::new("/tmp", "short").err().unwrap();
        assert_eq!(
            err.error_kind,
            ErrorKind::Store(StoreErrorKind::EncryptionFailed)
        );
    }
}
