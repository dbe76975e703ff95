use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::AuthError;
use crate::api::error::truncate_body;
use crate::utils::de::lenient_u64;

/// Lifetime assumed when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// A bearer token with an explicit expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Utc::now() + lifetime,
        }
    }

    pub fn with_expiry(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The raw bearer string.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the token will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES) >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Result<AccessToken, AuthError> {
        if let Some(ref tt) = self.token_type {
            if !tt.eq_ignore_ascii_case("bearer") {
                return Err(AuthError::UnsupportedTokenType(tt.clone()));
            }
        }
        if self.access_token.is_empty() {
            return Err(AuthError::InvalidResponse("empty access_token".into()));
        }

        let lifetime = self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let lifetime = Duration::seconds(i64::from(u32::try_from(lifetime).unwrap_or(u32::MAX)));
        Ok(AccessToken::new(self.access_token, lifetime))
    }
}

/// Parse a token endpoint reply body. Non-success statuses become
/// [`AuthError::Rejected`] with the provider's `error_description` when present.
pub(crate) fn parse_token_body(status: reqwest::StatusCode, body: &str) -> Result<AccessToken, AuthError> {
    if !status.is_success() {
        let parsed = serde_json::from_str::<TokenErrorResponse>(body).ok();
        let error = parsed
            .as_ref()
            .and_then(|p| p.error.clone())
            .unwrap_or_else(|| "unknown_error".to_string());
        let description = parsed
            .and_then(|p| p.error_description)
            .unwrap_or_else(|| truncate_body(body));
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            error,
            description,
        });
    }

    serde_json::from_str::<TokenResponse>(body)
        .map_err(|e| AuthError::InvalidResponse(format!("{}: {}", e, truncate_body(body))))?
        .into_token()
}

/// Read a token endpoint response and turn it into an [`AccessToken`].
pub(crate) async fn read_token_response(response: reqwest::Response) -> Result<AccessToken, AuthError> {
    let status = response.status();
    let body = response.text().await?;
    parse_token_body(status, &body)
}
