//! Nonce-gated identity exchange.
//!
//! One attempt runs as a two-stage pipeline:
//! 1. [`Coordinator::begin_sign_in`] creates the nonce and the outward request
//! 2. [`Coordinator::deliver`] takes the provider's answer, exchanges it with
//!    the backend and resolves the attempt's [`OutcomeReceiver`]

use chrono::Duration;
use tracing::{debug, info, warn};

use super::attempt::{expired_error, AbandonGuard, Attempt};
use super::{
    AttemptId, AttemptRegistry, Authorization, AuthorizationRequest, ExchangeOutcome,
    IdentityAssertion, IdentityProvider, Nonce, OutcomeReceiver, Scope, UnverifiedClaims,
    DEFAULT_NONCE_LENGTH,
};
use crate::backend::{Backend, Credential};
use crate::error::{oauth_error, provider_error, Error, OAuthErrorKind};
use crate::store::{RecordStore, SecureStore, UserData};

/// Attempt that has been sent to the provider and awaits its answer.
#[derive(Debug)]
pub struct PendingAttempt {
    /// Request to present to the identity provider.
    pub request: AuthorizationRequest,
    /// Resolves once with the attempt's outcome.
    pub outcome: OutcomeReceiver,
}

/// Coordinates sign-in attempts between an identity provider and a backend.
///
/// Only one attempt may be outstanding at a time. Each attempt's raw nonce is
/// reachable only through its [`AttemptId`], so an assertion can never be
/// exchanged with another attempt's nonce.
pub struct Coordinator<B: Backend, S: SecureStore> {
    backend: B,
    records: RecordStore<S>,
    attempts: AttemptRegistry,
    nonce_length: usize,
}

impl<B: Backend, S: SecureStore> Coordinator<B, S> {
    /// Create a coordinator with a 10 minute attempt TTL and 32 character nonces.
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            records: RecordStore::new(store),
            attempts: AttemptRegistry::new(),
            nonce_length: DEFAULT_NONCE_LENGTH,
        }
    }

    /// Set how long an attempt may wait for the provider before it expires.
    pub fn with_attempt_ttl(mut self, ttl: Duration) -> Self {
        self.attempts = AttemptRegistry::with_ttl(ttl);
        self
    }

    /// Set the length of generated nonces.
    pub fn with_nonce_length(mut self, nonce_length: usize) -> Self {
        self.nonce_length = nonce_length;
        self
    }

    /// Get the local record store.
    pub fn records(&self) -> &RecordStore<S> {
        &self.records
    }

    /// Get the registry of outstanding attempts.
    pub fn attempts(&self) -> &AttemptRegistry {
        &self.attempts
    }

    /// Start a new attempt.
    ///
    /// Generates a fresh nonce and returns the request carrying its verifier.
    /// Fails with `AttemptInProgress` while another attempt is outstanding.
    pub fn begin_sign_in(&self) -> Result<PendingAttempt, Error> {
        let nonce = Nonce::generate(self.nonce_length)?;
        let (attempt_id, verifier, outcome) = self.attempts.open(nonce)?;

        debug!("Started sign-in attempt {}", attempt_id);

        Ok(PendingAttempt {
            request: AuthorizationRequest {
                attempt_id,
                verifier,
                scopes: vec![Scope::FullName, Scope::Email],
            },
            outcome,
        })
    }

    /// Deliver the provider's answer for an attempt.
    ///
    /// The attempt's outcome is sent to its [`OutcomeReceiver`]. An error is
    /// returned here only when the attempt is not outstanding (`InvalidState`);
    /// in that case no outcome is sent anywhere.
    pub async fn deliver(
        &self,
        attempt_id: AttemptId,
        authorization: Authorization,
    ) -> Result<(), Error> {
        let attempt = self.attempts.take(&attempt_id).ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidState,
                &format!("Assertion received with no outstanding request for attempt {}", attempt_id),
            )
        })?;

        if attempt.is_expired() {
            warn!("Discarding answer for expired sign-in attempt {}", attempt_id);
            attempt.resolve(Err(expired_error()));
            return Ok(());
        }

        let outcome = self.exchange(&attempt, authorization).await;
        match &outcome {
            Ok(session) => info!(
                "Sign-in attempt {} succeeded for user {}",
                attempt_id, session.uid
            ),
            Err(e) => warn!("Sign-in attempt {} failed: {}", attempt_id, e),
        }

        attempt.resolve(outcome);
        Ok(())
    }

    /// Resolve an outstanding attempt with `Cancelled`.
    pub fn cancel(&self, attempt_id: AttemptId) -> Result<(), Error> {
        let attempt = self.attempts.take(&attempt_id).ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidState,
                &format!("No outstanding sign-in attempt {}", attempt_id),
            )
        })?;

        debug!("Cancelled sign-in attempt {}", attempt_id);
        attempt.resolve(Err(oauth_error(
            OAuthErrorKind::Cancelled,
            "Sign-in attempt was cancelled",
        )));
        Ok(())
    }

    /// Resolve every expired attempt with `Expired`.
    pub fn cleanup_expired(&self) -> usize {
        self.attempts.cleanup_expired()
    }

    /// Run a full attempt against a provider and wait for its outcome.
    ///
    /// Dropping the returned future before the provider answers resolves the
    /// attempt with `Cancelled` and frees the registry.
    pub async fn sign_in<P: IdentityProvider + ?Sized>(&self, provider: &P) -> ExchangeOutcome {
        let pending = self.begin_sign_in()?;
        let attempt_id = pending.request.attempt_id;
        let _guard = AbandonGuard::new(&self.attempts, attempt_id);

        let authorization = provider.authorize(&pending.request).await;
        self.deliver(attempt_id, authorization).await?;

        pending.outcome.wait().await
    }

    async fn exchange(&self, attempt: &Attempt, authorization: Authorization) -> ExchangeOutcome {
        match authorization {
            Authorization::Failed(failure) => {
                Err(provider_error(failure.kind, &failure.message))
            }
            Authorization::AppleId(assertion) => {
                let id_token = assertion.decode_identity_token()?;

                if let Some(claimed) = UnverifiedClaims::peek(&id_token).and_then(|c| c.nonce) {
                    if claimed != attempt.verifier.as_str() {
                        return Err(oauth_error(
                            OAuthErrorKind::InvalidState,
                            "Identity token was issued for a different sign-in attempt",
                        ));
                    }
                }

                if assertion.has_full_profile() {
                    self.register(&assertion).await;
                }

                let credential = Credential::apple(id_token, attempt.nonce.as_str());
                self.backend.sign_in_with_credential(&credential).await
            }
            Authorization::Password(password) => {
                let credential = Credential::Password {
                    email: password.user,
                    password: password.password,
                };
                self.backend.sign_in_with_credential(&credential).await
            }
        }
    }

    /// Cache the first-consent profile. Failures are logged and ignored.
    async fn register(&self, assertion: &IdentityAssertion) {
        let (Some(email), Some(name)) = (&assertion.email, &assertion.full_name) else {
            return;
        };
        if assertion.user.is_empty() {
            debug!("Not caching profile without a user identifier");
            return;
        }

        let user = UserData {
            email: email.clone(),
            name: name.clone(),
            identifier: assertion.user.clone(),
        };

        match self.records.store(&assertion.user, &user).await {
            Ok(()) => debug!(
                "Cached profile of {} for {}",
                name.display_name().unwrap_or_else(|| email.clone()),
                assertion.user
            ),
            Err(e) => warn!("Unable to cache profile for {}: {}", assertion.user, e),
        }
    }
}
