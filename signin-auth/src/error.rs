//! Error types for the `signin-auth` crate.
//!
//! A root Error struct holds an error kind tree and an optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for signin-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in signin-auth.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Backend(BackendErrorKind),
    Store(StoreErrorKind),
    Http(HttpErrorKind),
}

/// Errors from the nonce-gated sign-in flow.
#[derive(Debug, Clone, PartialEq)]
pub enum OAuthErrorKind {
    /// The secure random source could not produce bytes.
    NonceGeneration,
    InvalidNonceLength,
    /// The outward request could not be built.
    InvalidRequest,
    /// The identity provider declined or failed the request.
    Provider(ProviderErrorKind),
    /// Identity token missing or undecodable.
    MalformedAssertion,
    /// Assertion does not belong to an outstanding attempt.
    InvalidState,
    AttemptInProgress,
    Expired,
    Cancelled,
}

/// Authorization failure codes reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Canceled,
    Failed,
    InvalidResponse,
    NotHandled,
    Unknown,
}

/// Errors from the backend authentication exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendErrorKind {
    InvalidCredential,
    NonceMismatch,
    UserDisabled,
    /// Any other rejection, carrying the backend's error code.
    Rejected(String),
    InvalidResponse,
    Network,
}

/// Errors from the local secure store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreErrorKind {
    NotFound,
    CallFailed,
    BadData,
    Archive,
    EncryptionFailed,
    DecryptionFailed,
}

/// Errors from HTTP client operations.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// True when this error came from the identity provider rather than the exchange.
    pub fn is_provider_error(&self) -> bool {
        matches!(self.error_kind, ErrorKind::OAuth(OAuthErrorKind::Provider(_)))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "Sign-in error: {:?}", kind)?,
            ErrorKind::Backend(kind) => write!(f, "Backend exchange error: {:?}", kind)?,
            ErrorKind::Store(kind) => write!(f, "Secure store error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Http(HttpErrorKind::Network),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Store(StoreErrorKind::Archive),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let error_kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::Store(StoreErrorKind::NotFound)
        } else {
            ErrorKind::Store(StoreErrorKind::CallFailed)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create sign-in flow errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create provider errors.
pub fn provider_error(kind: ProviderErrorKind, message: &str) -> Error {
    oauth_error(OAuthErrorKind::Provider(kind), message)
}

/// Helper function to create backend exchange errors.
pub fn backend_error(kind: BackendErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Backend(kind),
    }
}

/// Helper function to create secure store errors.
pub fn store_error(kind: StoreErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Store(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_message() {
        let err = oauth_error(OAuthErrorKind::InvalidState, "no outstanding request");
        let rendered = err.to_string();
        assert!(rendered.contains("InvalidState"));
        assert!(rendered.contains("no outstanding request"));
    }

    #[test]
    fn test_provider_error_is_provider_error() {
        let err = provider_error(ProviderErrorKind::Canceled, "user cancelled");
        assert!(err.is_provider_error());
        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::Provider(ProviderErrorKind::Canceled))
        );
    }

    #[test]
    fn test_io_not_found_maps_to_store_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.error_kind, ErrorKind::Store(StoreErrorKind::NotFound));
    }
}
