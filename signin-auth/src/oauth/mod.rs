//! Nonce-gated sign-in flow.
//!
//! A [`Coordinator`] opens one attempt at a time, hands the hashed nonce to an
//! [`IdentityProvider`] and exchanges the returned assertion with a backend.

mod attempt;
mod coordinator;
mod id_token;
mod nonce;
mod provider;

pub mod apple;

pub use attempt::{AttemptId, AttemptRegistry, ExchangeOutcome, OutcomeReceiver};
pub use coordinator::{Coordinator, PendingAttempt};
pub use id_token::UnverifiedClaims;
pub use nonce::{Nonce, Verifier, DEFAULT_NONCE_LENGTH, NONCE_CHARSET};
pub use provider::{
    Authorization, AuthorizationRequest, IdentityAssertion, IdentityProvider, PasswordAssertion,
    PersonName, ProviderFailure, Scope,
};
