//! Outstanding sign-in attempts.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::{Nonce, Verifier};
use crate::backend::Session;
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};

/// Terminal result of one sign-in attempt.
pub type ExchangeOutcome = Result<Session, Error>;

/// Identifier of a single sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an attempt id echoed back by a provider (e.g. the `state` parameter).
    pub fn parse_str(value: &str) -> Result<Self, Error> {
        Uuid::parse_str(value).map(Self).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidState),
        })
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State held for one attempt between the outward request and the inward exchange.
pub(crate) struct Attempt {
    pub(crate) id: AttemptId,
    pub(crate) nonce: Nonce,
    pub(crate) verifier: Verifier,
    pub(crate) expires_at: DateTime<Utc>,
    outcome: oneshot::Sender<ExchangeOutcome>,
}

impl Attempt {
    pub(crate) fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Deliver the attempt's outcome. Consumes the attempt, so it can only happen once.
    pub(crate) fn resolve(self, outcome: ExchangeOutcome) {
        if self.outcome.send(outcome).is_err() {
            debug!("Outcome receiver for attempt {} was dropped", self.id);
        }
    }
}

/// Receiving half of an attempt's outcome notification.
#[derive(Debug)]
pub struct OutcomeReceiver(oneshot::Receiver<ExchangeOutcome>);

impl OutcomeReceiver {
    /// Wait for the attempt to resolve.
    ///
    /// Resolves to `Cancelled` if the attempt was dropped without an outcome.
    pub async fn wait(self) -> ExchangeOutcome {
        self.0.await.unwrap_or_else(|_| {
            Err(oauth_error(
                OAuthErrorKind::Cancelled,
                "Sign-in attempt was dropped before it resolved",
            ))
        })
    }

    /// Take the outcome if the attempt has already resolved.
    pub fn try_outcome(&mut self) -> Option<ExchangeOutcome> {
        self.0.try_recv().ok()
    }
}

/// Registry of outstanding attempts with expiration.
///
/// At most one unexpired attempt is outstanding at a time. Removing an attempt
/// is the only way to reach its nonce, so every attempt resolves exactly once.
pub struct AttemptRegistry {
    attempts: Mutex<HashMap<AttemptId, Attempt>>,
    ttl: Duration,
}

impl AttemptRegistry {
    /// Create a registry with the default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a registry with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a new attempt for the given nonce.
    ///
    /// Expired attempts are resolved with `Expired` first. Fails with
    /// `AttemptInProgress` if another attempt is still outstanding.
    pub(crate) fn open(
        &self,
        nonce: Nonce,
    ) -> Result<(AttemptId, Verifier, OutcomeReceiver), Error> {
        let mut attempts = self.lock();
        Self::evict_expired(&mut attempts);

        if let Some(outstanding) = attempts.keys().next() {
            return Err(oauth_error(
                OAuthErrorKind::AttemptInProgress,
                &format!("Sign-in attempt {} is still outstanding", outstanding),
            ));
        }

        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidRequest,
                "Sign-in attempt TTL is out of range",
            )
        })?;

        let id = AttemptId::new();
        let verifier = nonce.verifier();
        let (sender, receiver) = oneshot::channel();

        attempts.insert(
            id,
            Attempt {
                id,
                nonce,
                verifier: verifier.clone(),
                expires_at,
                outcome: sender,
            },
        );

        Ok((id, verifier, OutcomeReceiver(receiver)))
    }

    /// Remove and return an attempt, expired or not.
    pub(crate) fn take(&self, id: &AttemptId) -> Option<Attempt> {
        self.lock().remove(id)
    }

    /// Resolve every expired attempt with `Expired`.
    ///
    /// Returns the number of attempts that were expired.
    pub fn cleanup_expired(&self) -> usize {
        let mut attempts = self.lock();
        Self::evict_expired(&mut attempts)
    }

    /// Number of attempts currently registered.
    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }

    fn evict_expired(attempts: &mut HashMap<AttemptId, Attempt>) -> usize {
        let expired: Vec<AttemptId> = attempts
            .values()
            .filter(|attempt| attempt.is_expired())
            .map(|attempt| attempt.id)
            .collect();

        for id in &expired {
            if let Some(attempt) = attempts.remove(id) {
                debug!("Sign-in attempt {} expired", id);
                attempt.resolve(Err(expired_error()));
            }
        }

        expired.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AttemptId, Attempt>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves an attempt with `Cancelled` when dropped, unless it was already taken.
///
/// Keeps a dropped or timed-out `sign_in` from holding the registry until the TTL.
pub(crate) struct AbandonGuard<'a> {
    attempts: &'a AttemptRegistry,
    attempt_id: AttemptId,
}

impl<'a> AbandonGuard<'a> {
    pub(crate) fn new(attempts: &'a AttemptRegistry, attempt_id: AttemptId) -> Self {
        Self {
            attempts,
            attempt_id,
        }
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if let Some(attempt) = self.attempts.take(&self.attempt_id) {
            debug!("Sign-in attempt {} abandoned", self.attempt_id);
            attempt.resolve(Err(oauth_error(
                OAuthErrorKind::Cancelled,
                "Sign-in attempt was abandoned before the provider answered",
            )));
        }
    }
}

impl Default for AttemptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn expired_error() -> Error {
    oauth_error(
        OAuthErrorKind::Expired,
        "Sign-in attempt expired before the provider answered",
    )
}
