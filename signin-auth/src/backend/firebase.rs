//! Firebase Authentication backend over the Identity Toolkit REST API.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Credential, Session};
use crate::error::{backend_error, BackendErrorKind, Error, ErrorKind};
use crate::http::HttpClient;

/// Production Identity Toolkit endpoint.
pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Request URI reported for native sign-ins that have no redirect.
pub const DEFAULT_REQUEST_URI: &str = "http://localhost";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Lifetime of the ID token in seconds, as a decimal string.
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// Firebase Authentication backend.
///
/// Exchanges Apple identity tokens through `accounts:signInWithIdp` and
/// saved passwords through `accounts:signInWithPassword`.
pub struct Backend {
    api_key: SecretString,
    base_url: String,
    request_uri: String,
    http_client: HttpClient,
}

impl Backend {
    /// Create a new Firebase backend.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Firebase Web API key
    /// * `base_url` - Identity Toolkit base URL, overridden in tests
    /// * `request_uri` - URI reported as the IdP redirect
    /// * `http_client` - Client used for all requests
    pub fn new(
        api_key: SecretString,
        base_url: &str,
        request_uri: &str,
        http_client: HttpClient,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_uri: request_uri.to_string(),
            http_client,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.base_url,
            method,
            urlencoding::encode(self.api_key.expose_secret())
        )
    }

    async fn post<T: Serialize + Sync>(&self, method: &str, body: &T) -> Result<SignInResponse, Error> {
        let response = self
            .http_client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Backend(BackendErrorKind::Network),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Backend(BackendErrorKind::Network),
        })?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Backend(BackendErrorKind::InvalidResponse),
            });
        }

        match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            Ok(envelope) => {
                warn!(
                    "Firebase {} rejected the credential ({}): {}",
                    method, envelope.error.code, envelope.error.message
                );
                Err(backend_error(
                    classify(&envelope.error.message),
                    &envelope.error.message,
                ))
            }
            Err(_) => Err(backend_error(
                BackendErrorKind::InvalidResponse,
                &format!("Firebase {} failed with status {}", method, status),
            )),
        }
    }

    fn into_session(response: SignInResponse, provider_id: &str) -> Session {
        let expires_at = response
            .expires_in
            .as_deref()
            .and_then(|secs| secs.parse::<i64>().ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Session {
            uid: response.local_id,
            id_token: SecretString::from(response.id_token),
            refresh_token: response.refresh_token.map(SecretString::from),
            expires_at,
            email: response.email,
            provider_id: response
                .provider_id
                .unwrap_or_else(|| provider_id.to_string()),
            is_new_user: response.is_new_user,
        }
    }
}

/// Map a Firebase error message (`CODE` or `CODE : detail`) to an error kind.
fn classify(message: &str) -> BackendErrorKind {
    let code = message.split(':').next().unwrap_or(message).trim();
    match code {
        "MISSING_OR_INVALID_NONCE" => BackendErrorKind::NonceMismatch,
        "INVALID_IDP_RESPONSE"
        | "INVALID_ID_TOKEN"
        | "INVALID_CREDENTIAL_OR_PROVIDER_ID"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_PASSWORD"
        | "EMAIL_NOT_FOUND" => BackendErrorKind::InvalidCredential,
        "USER_DISABLED" => BackendErrorKind::UserDisabled,
        other => BackendErrorKind::Rejected(other.to_string()),
    }
}

#[async_trait]
impl super::Backend for Backend {
    async fn sign_in_with_credential(&self, credential: &Credential) -> Result<Session, Error> {
        let response = match credential {
            Credential::IdToken {
                provider_id,
                id_token,
                raw_nonce,
            } => {
                debug!("Exchanging {} identity token with Firebase", provider_id);
                let post_body = format!(
                    "id_token={}&providerId={}&nonce={}",
                    urlencoding::encode(id_token.expose_secret()),
                    urlencoding::encode(provider_id),
                    urlencoding::encode(raw_nonce.expose_secret()),
                );
                let request = SignInWithIdpRequest {
                    post_body,
                    request_uri: self.request_uri.clone(),
                    return_idp_credential: true,
                    return_secure_token: true,
                };
                self.post("signInWithIdp", &request).await?
            }
            Credential::Password { email, password } => {
                debug!("Exchanging saved password with Firebase");
                let request = SignInWithPasswordRequest {
                    email,
                    password: password.expose_secret(),
                    return_secure_token: true,
                };
                self.post("signInWithPassword", &request).await?
            }
        };

        Ok(Self::into_session(response, credential.provider_id()))
    }
}
