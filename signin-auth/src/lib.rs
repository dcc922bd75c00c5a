//! # signin-auth
//!
//! Sign in with Apple exchanged for a backend session:
//! - One-time nonces, hashed before they leave the process
//! - One outstanding attempt at a time, each resolved exactly once
//! - Firebase Identity Toolkit as the session backend
//! - Encrypted local cache for the profile Apple only sends on first consent
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signin_auth::{
//!     backend::firebase,
//!     http::HttpClientBuilder,
//!     oauth::Coordinator,
//!     store::MemoryStore,
//! };
//!
//! let http = HttpClientBuilder::new().build()?;
//! let backend = firebase::Backend::new(api_key, firebase::DEFAULT_BASE_URL, "http://localhost", http);
//! let coordinator = Coordinator::new(backend, MemoryStore::new());
//! let session = coordinator.sign_in(&provider).await?;
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod oauth;
pub mod store;

pub use error::{Error, ErrorKind};
