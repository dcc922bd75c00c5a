//! Sign in with Apple web flow.
//!
//! Builds the authorization URL for an attempt and turns the `form_post`
//! callback body Apple sends to the redirect URI into an [`Authorization`].

use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{
    AttemptId, Authorization, AuthorizationRequest, IdentityAssertion, PersonName,
    ProviderFailure, UnverifiedClaims,
};
use crate::error::{Error, ErrorKind, OAuthErrorKind, ProviderErrorKind};

/// Apple's authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://appleid.apple.com/auth/authorize";

/// Builds Sign in with Apple authorization URLs.
#[derive(Debug, Clone)]
pub struct AuthorizeUrl {
    authorize_url: String,
    client_id: String,
    redirect_uri: String,
}

impl AuthorizeUrl {
    /// # Arguments
    ///
    /// * `client_id` - Services ID registered with Apple
    /// * `redirect_uri` - URI Apple posts the authorization response to
    pub fn new(client_id: &str, redirect_uri: &str) -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
        }
    }

    /// Override the authorization endpoint.
    pub fn with_authorize_url(mut self, authorize_url: &str) -> Self {
        self.authorize_url = authorize_url.to_string();
        self
    }

    /// Build the URL for an attempt.
    ///
    /// The verifier is sent as `nonce` and the attempt id as `state`.
    pub fn build(&self, request: &AuthorizationRequest) -> Result<Url, Error> {
        let scope = request
            .scopes
            .iter()
            .map(|scope| scope.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let state = request.attempt_id.to_string();

        let mut params = vec![
            ("response_type", "code id_token"),
            ("response_mode", "form_post"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("nonce", request.verifier.as_str()),
            ("state", state.as_str()),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        Url::parse_with_params(&self.authorize_url, &params).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidRequest),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct FormPostUser {
    #[serde(default)]
    name: Option<FormPostName>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormPostName {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

/// Interpret the `application/x-www-form-urlencoded` body Apple posts back.
///
/// The `state` must match `attempt_id`, for error callbacks too. The `user`
/// field is only present on first consent and supplies the name; the email
/// falls back to the identity token's claim.
pub fn authorization_from_form_post(body: &str, attempt_id: AttemptId) -> Authorization {
    let mut state = None;
    let mut code = None;
    let mut id_token = None;
    let mut user = None;
    let mut error = None;

    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "state" => state = Some(value.into_owned()),
            "code" => code = Some(value.into_owned()),
            "id_token" => id_token = Some(value.into_owned()),
            "user" => user = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            other => debug!("Ignoring form_post field {}", other),
        }
    }

    if state.as_deref() != Some(attempt_id.to_string().as_str()) {
        return Authorization::Failed(ProviderFailure::new(
            ProviderErrorKind::InvalidResponse,
            "Authorization response state does not match the attempt",
        ));
    }

    if let Some(error) = error {
        let kind = match error.as_str() {
            "user_cancelled_authorize" => ProviderErrorKind::Canceled,
            "invalid_request" | "invalid_client" => ProviderErrorKind::InvalidResponse,
            _ => ProviderErrorKind::Failed,
        };
        return Authorization::Failed(ProviderFailure::new(kind, error));
    }

    let profile: FormPostUser = user
        .as_deref()
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default();
    let claims = id_token
        .as_deref()
        .and_then(UnverifiedClaims::peek)
        .unwrap_or_default();

    Authorization::AppleId(IdentityAssertion {
        user: claims.sub.unwrap_or_default(),
        identity_token: id_token.map(String::into_bytes),
        authorization_code: code.map(String::into_bytes),
        email: profile.email.or(claims.email),
        full_name: profile.name.map(|name| PersonName {
            given_name: name.first_name,
            family_name: name.last_name,
        }),
    })
}
