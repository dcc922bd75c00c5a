use async_trait::async_trait;
use secrecy::SecretString;
use signin_auth::error::ProviderErrorKind;
use signin_auth::oauth::{
    apple::{self, AuthorizeUrl},
    AttemptId, Authorization, AuthorizationRequest, IdentityProvider, PasswordAssertion,
    ProviderFailure,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Identity provider driven from the terminal.
///
/// Prints the Sign in with Apple URL and reads back one line: either the
/// `form_post` body Apple sent to the redirect URI, or `password <email>
/// <password>` to sign in with a saved credential. An empty line cancels.
pub struct ConsoleProvider {
    authorize_url: AuthorizeUrl,
}

impl ConsoleProvider {
    pub fn new(authorize_url: AuthorizeUrl) -> Self {
        Self { authorize_url }
    }
}

#[async_trait]
impl IdentityProvider for ConsoleProvider {
    async fn authorize(&self, request: &AuthorizationRequest) -> Authorization {
        let url = match self.authorize_url.build(request) {
            Ok(url) => url,
            Err(e) => {
                return Authorization::Failed(ProviderFailure::new(
                    ProviderErrorKind::Failed,
                    e.to_string(),
                ))
            }
        };

        println!("Open this URL to sign in with Apple:\n\n  {}\n", url);
        println!("Paste the form_post body posted to the redirect URI (empty line cancels):");

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => parse_response(&line, request.attempt_id),
            Err(e) => Authorization::Failed(ProviderFailure::new(
                ProviderErrorKind::Failed,
                format!("Unable to read the authorization response: {}", e),
            )),
        }
    }
}

fn parse_response(line: &str, attempt_id: AttemptId) -> Authorization {
    let line = line.trim();
    if line.is_empty() {
        return Authorization::Failed(ProviderFailure::canceled());
    }

    if let Some(rest) = line.strip_prefix("password ") {
        return match rest.trim().split_once(' ') {
            Some((user, password)) if !password.trim().is_empty() => {
                Authorization::Password(PasswordAssertion {
                    user: user.to_string(),
                    password: SecretString::from(password.trim().to_string()),
                })
            }
            _ => Authorization::Failed(ProviderFailure::new(
                ProviderErrorKind::InvalidResponse,
                "Expected `password <email> <password>`",
            )),
        };
    }

    apple::authorization_from_form_post(line, attempt_id)
}
