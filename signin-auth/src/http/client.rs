//! Backend HTTP client with transient-failure retries.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::error::Error;

/// HTTP client with middleware.
pub type HttpClient = reqwest_middleware::ClientWithMiddleware;

/// Builds the client the backend exchange talks through.
///
/// Defaults to a 30s timeout and 3 retries.
pub struct HttpClientBuilder {
    timeout: Duration,
    max_retries: u32,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first attempt; 0 disables retrying.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Result<HttpClient, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("signin-auth/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(BackoffPolicy::new(
                self.max_retries,
            )))
            .build())
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
