//! AES-256-GCM encryption for records cached on disk.
//!
//! The key is 32 bytes provided as a hex-encoded string (64 characters).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;

use crate::error::{Error, ErrorKind, StoreErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn encryption_err() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Store(StoreErrorKind::EncryptionFailed),
    }
}

fn decryption_err() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Store(StoreErrorKind::DecryptionFailed),
    }
}

/// Encrypts bytes using AES-256-GCM with a random nonce.
///
/// The nonce is prepended to the ciphertext and the result is base64-encoded.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<String, Error> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| encryption_err())?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| encryption_err())?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend(ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypts a base64-encoded ciphertext produced by [`encrypt`].
pub fn decrypt(ciphertext_b64: &str, key: &[u8; 32]) -> Result<Vec<u8>, Error> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| decryption_err())?;

    let combined = BASE64.decode(ciphertext_b64.trim()).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Store(StoreErrorKind::DecryptionFailed),
    })?;

    if combined.len() < NONCE_SIZE {
        return Err(decryption_err());
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| decryption_err())
}

/// Parse a 64 character hex key.
pub fn parse_key(key_hex: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(key_hex.trim()).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Store(StoreErrorKind::EncryptionFailed),
    })?;
    if bytes.len() != 32 {
        return Err(encryption_err());
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn key() -> [u8; 32] {
        parse_key(TEST_KEY).unwrap()
    }

    #[test]
    fn test_encrypt_produces_different_outputs() {
        let plaintext = br#"{"email":"jane@example.com"}"#;
        let encrypted1 = encrypt(plaintext, &key()).unwrap();
        let encrypted2 = encrypt(plaintext, &key()).unwrap();
        assert_ne!(encrypted1, encrypted2);
        assert_eq!(decrypt(&encrypted1, &key()).unwrap(), plaintext);
        assert_eq!(decrypt(&encrypted2, &key()).unwrap(), plaintext);
    }

    #[test]
    fn test_invalid_key_returns_encryption_failed() {
        for bad in ["not-valid-hex!", "abcd"] {
            let err = parse_key(bad).unwrap_err();
            assert_eq!(
                err.error_kind,
                ErrorKind::Store(StoreErrorKind::EncryptionFailed)
            );
        }
    }

    #[test]
    fn test_wrong_key_returns_decryption_failed() {
        let encrypted = encrypt(b"secret", &key()).unwrap();
        let wrong_key =
            parse_key("ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff").unwrap();

        let err = decrypt(&encrypted, &wrong_key).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Store(StoreErrorKind::DecryptionFailed)
        );
    }

    #[test]
    fn test_corrupted_or_short_ciphertext_returns_decryption_failed() {
        for corrupted in ["not_valid_base64!!!", "YWJj"] {
            let err = decrypt(corrupted, &key()).unwrap_err();
            assert_eq!(
                err.error_kind,
                ErrorKind::Store(StoreErrorKind::DecryptionFailed)
            );
        }
    }
}
