//! Backend authentication exchange.
//!
//! Trades a provider assertion (plus the raw nonce) for a backend session.

pub mod firebase;
mod session;

pub use session::Session;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

/// Provider identifier the backend expects for Sign in with Apple.
pub const APPLE_PROVIDER_ID: &str = "apple.com";

/// Provider identifier for email/password sessions.
pub const PASSWORD_PROVIDER_ID: &str = "password";

/// Credential submitted to the backend.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Provider identity token bound to the attempt's raw nonce.
    IdToken {
        provider_id: String,
        id_token: SecretString,
        raw_nonce: SecretString,
    },
    /// Saved username and password.
    Password {
        email: String,
        password: SecretString,
    },
}

impl Credential {
    /// Build a Sign in with Apple credential.
    pub fn apple(id_token: String, raw_nonce: &str) -> Self {
        Credential::IdToken {
            provider_id: APPLE_PROVIDER_ID.to_string(),
            id_token: SecretString::from(id_token),
            raw_nonce: SecretString::from(raw_nonce.to_string()),
        }
    }

    /// Provider identifier this credential is exchanged under.
    pub fn provider_id(&self) -> &str {
        match self {
            Credential::IdToken { provider_id, .. } => provider_id,
            Credential::Password { .. } => PASSWORD_PROVIDER_ID,
        }
    }
}

/// Trait for backend authentication services.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange a credential for an authenticated session.
    async fn sign_in_with_credential(&self, credential: &Credential) -> Result<Session, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_apple_credential_carries_raw_nonce() {
        let credential = Credential::apple("token".to_string(), "raw-nonce");
        assert_eq!(credential.provider_id(), "apple.com");

        match credential {
            Credential::IdToken {
                id_token,
                raw_nonce,
                ..
            } => {
                assert_eq!(id_token.expose_secret(), "token");
                assert_eq!(raw_nonce.expose_secret(), "raw-nonce");
            }
            Credential::Password { .. } => panic!("expected an id token credential"),
        }
    }
}
