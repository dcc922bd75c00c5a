//! Single-use sign-in nonce and its SHA-256 verifier.
//!
//! The raw nonce stays in memory for the lifetime of one attempt and is only
//! ever sent to the backend exchange. The identity provider sees the verifier.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};

/// Characters a nonce is drawn from.
pub const NONCE_CHARSET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-._";

/// Nonce length used when none is configured.
pub const DEFAULT_NONCE_LENGTH: usize = 32;

// Random bytes at or above this value are rejected so every character is equally likely.
const ACCEPT_BELOW: usize = 256 / NONCE_CHARSET.len() * NONCE_CHARSET.len();

const RANDOM_BATCH: usize = 16;

/// Raw (unhashed) nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a nonce of `length` characters from the OS secure random source.
    pub fn generate(length: usize) -> Result<Self, Error> {
        Self::generate_with(&mut OsRng, length)
    }

    /// Generate a nonce from the given random source.
    ///
    /// Fails with `NonceGeneration` if the source cannot produce bytes and with
    /// `InvalidNonceLength` for a zero length.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R, length: usize) -> Result<Self, Error> {
        if length == 0 {
            return Err(oauth_error(
                OAuthErrorKind::InvalidNonceLength,
                "Nonce length must be greater than zero",
            ));
        }

        let mut nonce = String::with_capacity(length);
        let mut batch = [0u8; RANDOM_BATCH];

        while nonce.len() < length {
            rng.try_fill_bytes(&mut batch).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::NonceGeneration),
            })?;

            for byte in batch.iter().map(|b| *b as usize) {
                if nonce.len() == length {
                    break;
                }
                if byte < ACCEPT_BELOW {
                    nonce.push(NONCE_CHARSET[byte % NONCE_CHARSET.len()] as char);
                }
            }
        }

        Ok(Self(nonce))
    }

    /// Create a nonce from an existing string.
    pub fn from_string(nonce: String) -> Self {
        Self(nonce)
    }

    /// Get the nonce string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compute the verifier sent to the identity provider.
    pub fn verifier(&self) -> Verifier {
        Verifier::from_nonce(self)
    }
}

/// Lowercase hex SHA-256 digest of a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verifier(String);

impl Verifier {
    /// Hash the UTF-8 bytes of the nonce.
    pub fn from_nonce(nonce: &Nonce) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nonce.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
