//! Identity provider trait and the request/response types exchanged with it.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::{AttemptId, Verifier};
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind, ProviderErrorKind};

/// Profile claims that can be requested from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    FullName,
    Email,
}

impl Scope {
    /// Get the scope string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::FullName => "name",
            Scope::Email => "email",
        }
    }
}

/// Outward authorization request for one sign-in attempt.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Attempt this request belongs to; echoed back as the provider state.
    pub attempt_id: AttemptId,
    /// Hashed nonce the provider embeds in the identity token.
    pub verifier: Verifier,
    /// Requested profile claims.
    pub scopes: Vec<Scope>,
}

/// A person's name as returned on first consent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl PersonName {
    /// Given and family name joined by a space, if any part is present.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Signed identity assertion issued by the provider.
#[derive(Debug, Clone, Default)]
pub struct IdentityAssertion {
    /// Provider's stable user identifier.
    pub user: String,
    /// Raw identity token bytes (a JWT).
    pub identity_token: Option<Vec<u8>>,
    /// Short-lived authorization code.
    pub authorization_code: Option<Vec<u8>>,
    /// Only present the first time the user consents.
    pub email: Option<String>,
    /// Only present the first time the user consents.
    pub full_name: Option<PersonName>,
}

impl IdentityAssertion {
    /// Decode the identity token to a string.
    ///
    /// A missing or non UTF-8 token is a `MalformedAssertion`.
    pub fn decode_identity_token(&self) -> Result<String, Error> {
        let bytes = self.identity_token.as_ref().ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::MalformedAssertion,
                "Unable to fetch identity token",
            )
        })?;

        String::from_utf8(bytes.clone()).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::MalformedAssertion),
        })
    }

    /// True when the assertion carries the full profile granted on first consent.
    pub fn has_full_profile(&self) -> bool {
        self.email.is_some() && self.full_name.is_some()
    }
}

/// Username and password picked from the platform's saved credentials.
#[derive(Debug, Clone)]
pub struct PasswordAssertion {
    pub user: String,
    pub password: SecretString,
}

/// Provider-reported failure such as a user cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The user dismissed the provider's sign-in sheet.
    pub fn canceled() -> Self {
        Self::new(ProviderErrorKind::Canceled, "The user canceled the authorization attempt")
    }
}

/// Everything a provider can answer with.
#[derive(Debug, Clone)]
pub enum Authorization {
    AppleId(IdentityAssertion),
    Password(PasswordAssertion),
    Failed(ProviderFailure),
}

/// Trait for identity providers.
///
/// Implementations present the provider's own sign-in flow and report back
/// whatever the user ended up doing. The flow is opaque to the coordinator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Present the authorization request and wait for the provider's answer.
    async fn authorize(&self, request: &AuthorizationRequest) -> Authorization;
}
