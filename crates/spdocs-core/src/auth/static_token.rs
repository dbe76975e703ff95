use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;

use super::{AccessToken, AuthError, TokenProvider};

/// Serves a token that was obtained elsewhere, e.g. handed over by another
/// process. Once it expires the session has nothing to refresh it with.
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }

    /// Wrap a raw bearer string, assuming it is valid for the given lifetime.
    pub fn from_bearer(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(AccessToken::new(secret, lifetime))
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn request_token(&self, _http: &Client) -> Result<AccessToken, AuthError> {
        if self.token.is_expired() {
            return Err(AuthError::InvalidResponse(
                "static token has expired and cannot be refreshed".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}
