//! Backend session types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// Authenticated backend session returned by a successful exchange.
#[derive(Debug, Clone)]
pub struct Session {
    /// Backend user identifier.
    pub uid: String,
    /// Backend ID token for API requests.
    pub id_token: SecretString,
    /// Refresh token for obtaining new ID tokens.
    pub refresh_token: Option<SecretString>,
    /// When the ID token expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
    /// Provider that vouched for the user (e.g. "apple.com", "password").
    pub provider_id: String,
    /// True when the exchange created the backend account.
    pub is_new_user: bool,
}

impl Session {
    /// Check if the ID token is expired or about to expire soon.
    ///
    /// Returns true if the token is expired or will expire within 5 minutes.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires| {
                let now = Utc::now();
                let buffer = chrono::Duration::minutes(5);
                expires <= (now + buffer)
            })
            .unwrap_or(false)
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Option<chrono::Duration> {
        self.expires_at.map(|expires| expires - Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            uid: "uid-1".to_string(),
            id_token: SecretString::from("id-token".to_string()),
            refresh_token: None,
            expires_at,
            email: None,
            provider_id: "apple.com".to_string(),
            is_new_user: false,
        }
    }

    #[test]
    fn test_session_not_expired() {
        assert!(!session(Some(Utc::now() + Duration::hours(1))).is_expired());
    }

    #[test]
    fn test_session_expiring_soon() {
        assert!(session(Some(Utc::now() + Duration::minutes(3))).is_expired());
    }

    #[test]
    fn test_session_without_expiry_never_expires() {
        let session = session(None);
        assert!(!session.is_expired());
        assert!(session.time_until_expiry().is_none());
    }
}
