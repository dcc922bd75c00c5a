//! Unverified peek into identity token claims.
//!
//! Signature verification belongs to the backend. These claims are only used
//! to route an assertion back to the attempt that requested it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// Claims read from an identity token payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnverifiedClaims {
    /// Stable user identifier.
    pub sub: Option<String>,
    /// Hashed nonce the token was issued for.
    pub nonce: Option<String>,
    pub email: Option<String>,
}

impl UnverifiedClaims {
    /// Decode the payload segment of a compact JWT.
    ///
    /// Returns `None` when the token is not a three-segment JWT with a JSON payload.
    pub fn peek(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
