use log::{error, info, warn};
use secrecy::SecretString;
use service::{config::Config, logging::Logger};
use signin_auth::backend::firebase;
use signin_auth::http::HttpClientBuilder;
use signin_auth::oauth::{apple::AuthorizeUrl, Coordinator};
use signin_auth::store::{EncryptedFileStore, MemoryStore, SecureStore};

mod console;

use console::ConsoleProvider;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    let Some(api_key) = config.firebase_api_key() else {
        error!("FIREBASE_API_KEY is not set");
        std::process::exit(1);
    };
    let Some(client_id) = config.apple_client_id() else {
        error!("APPLE_CLIENT_ID is not set");
        std::process::exit(1);
    };

    let http_client = match HttpClientBuilder::new()
        .with_timeout(config.http_timeout())
        .with_max_retries(config.http_max_retries)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let backend = firebase::Backend::new(
        SecretString::from(api_key),
        config.firebase_base_url(),
        config.firebase_request_uri(),
        http_client,
    );
    let provider = ConsoleProvider::new(
        AuthorizeUrl::new(&client_id, config.apple_redirect_uri())
            .with_authorize_url(config.apple_authorize_url()),
    );

    let signed_in = match config.secure_store_key() {
        Some(key) => match EncryptedFileStore::new(config.secure_store_dir().clone(), &key) {
            Ok(store) => run(&config, backend, store, &provider).await,
            Err(e) => {
                error!("Invalid SECURE_STORE_KEY: {e}");
                false
            }
        },
        None => {
            warn!("SECURE_STORE_KEY is not set, first-consent profiles are kept in memory only");
            run(&config, backend, MemoryStore::new(), &provider).await
        }
    };

    if !signed_in {
        std::process::exit(1);
    }
}

async fn run<S: SecureStore>(
    config: &Config,
    backend: firebase::Backend,
    store: S,
    provider: &ConsoleProvider,
) -> bool {
    let attempt_ttl = match chrono::Duration::from_std(config.attempt_ttl()) {
        Ok(ttl) => ttl,
        Err(e) => {
            error!("ATTEMPT_TTL_SECS is out of range: {e}");
            return false;
        }
    };

    let coordinator = Coordinator::new(backend, store)
        .with_attempt_ttl(attempt_ttl)
        .with_nonce_length(config.nonce_length);

    match coordinator.sign_in(provider).await {
        Ok(session) => {
            info!(
                "Signed in as {} via {}{}",
                session.uid,
                session.provider_id,
                if session.is_new_user { " (new user)" } else { "" }
            );
            if let Some(remaining) = session.time_until_expiry() {
                info!("Session token valid for {} minutes", remaining.num_minutes());
            }
            true
        }
        Err(e) if e.is_provider_error() => {
            warn!("Sign in with Apple did not complete: {e}");
            false
        }
        Err(e) => {
            error!("Sign-in failed: {e}");
            false
        }
    }
}
