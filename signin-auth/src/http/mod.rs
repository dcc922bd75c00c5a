//! HTTP client building with retry middleware.

mod client;
mod retry;

pub use client::{HttpClient, HttpClientBuilder};
pub use retry::BackoffPolicy;
