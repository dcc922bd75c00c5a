use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Sign in with Apple authorization endpoint.
pub const DEFAULT_APPLE_AUTHORIZE_URL: &str = "https://appleid.apple.com/auth/authorize";

/// Firebase Identity Toolkit base URL used when `FIREBASE_BASE_URL` is not set.
pub const DEFAULT_FIREBASE_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The Services ID registered for Sign in with Apple.
    #[arg(long, env)]
    apple_client_id: Option<String>,

    /// The redirect URI Apple posts the authorization response to.
    #[arg(long, env, default_value = "https://localhost/auth/apple/callback")]
    apple_redirect_uri: String,

    /// The Apple authorization endpoint.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_APPLE_AUTHORIZE_URL)]
    apple_authorize_url: String,

    /// The Web API key of the Firebase project.
    #[arg(long, env)]
    firebase_api_key: Option<String>,

    /// The base URL of the Firebase Identity Toolkit API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_FIREBASE_BASE_URL)]
    firebase_base_url: String,

    /// The request URI reported to Firebase for identity provider sign-ins.
    #[arg(long, env, default_value = "http://localhost")]
    firebase_request_uri: String,

    /// Number of characters in each generated sign-in nonce
    #[arg(long, env, default_value_t = 32)]
    pub nonce_length: usize,

    /// Seconds a sign-in attempt may wait for the identity provider
    #[arg(long, env, default_value_t = 600)]
    pub attempt_ttl_secs: u64,

    /// Timeout in seconds for each request to the backend
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Maximum number of retries for transient backend failures
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,

    /// Directory holding the encrypted profile cache
    #[arg(long, env, default_value = ".signin-store")]
    secure_store_dir: PathBuf,

    /// Hex-encoded 32 byte key for the profile cache. Profiles are kept in
    /// memory only when unset.
    #[arg(long, env)]
    secure_store_key: Option<String>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn apple_client_id(&self) -> Option<String> {
        self.apple_client_id.clone()
    }

    pub fn apple_redirect_uri(&self) -> &str {
        &self.apple_redirect_uri
    }

    pub fn apple_authorize_url(&self) -> &str {
        &self.apple_authorize_url
    }

    /// Returns the Firebase Web API key, if configured.
    pub fn firebase_api_key(&self) -> Option<String> {
        self.firebase_api_key.clone()
    }

    /// Returns the Firebase Identity Toolkit base URL.
    pub fn firebase_base_url(&self) -> &str {
        &self.firebase_base_url
    }

    pub fn firebase_request_uri(&self) -> &str {
        &self.firebase_request_uri
    }

    pub fn attempt_ttl(&self) -> Duration {
        Duration::from_secs(self.attempt_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn secure_store_dir(&self) -> &PathBuf {
        &self.secure_store_dir
    }

    /// Returns the profile cache key, if configured.
    pub fn secure_store_key(&self) -> Option<String> {
        self.secure_store_key.clone()
    }

    pub fn set_firebase_base_url(mut self, firebase_base_url: String) -> Self {
        self.firebase_base_url = firebase_base_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("signin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.apple_authorize_url(), DEFAULT_APPLE_AUTHORIZE_URL);
        assert_eq!(config.firebase_base_url(), DEFAULT_FIREBASE_BASE_URL);
        assert_eq!(config.firebase_request_uri(), "http://localhost");
        assert_eq!(config.nonce_length, 32);
        assert_eq!(config.attempt_ttl(), Duration::from_secs(600));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.http_max_retries, 3);
        assert_eq!(config.log_level_filter, LevelFilter::Info);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--apple-client-id",
            "com.example.signin",
            "--firebase-api-key",
            "test-api-key",
            "--attempt-ttl-secs",
            "30",
            "--log-level-filter",
            "DEBUG",
        ])
        .set_firebase_base_url("http://127.0.0.1:1234".to_string());

        assert_eq!(config.apple_client_id(), Some("com.example.signin".to_string()));
        assert_eq!(config.firebase_api_key(), Some("test-api-key".to_string()));
        assert_eq!(config.attempt_ttl(), Duration::from_secs(30));
        assert_eq!(config.firebase_base_url(), "http://127.0.0.1:1234");
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let result = Config::try_parse_from(["signin", "--log-level-filter", "VERBOSE"]);
        assert!(result.is_err());
    }
}
