use std::time::Duration;

use reqwest::{header, Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::{AccessToken, AuthError, TokenProvider};
use crate::api::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow SharePoint responses while never hanging forever.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// An authorized connection: one token provider, zero-or-one cached token and
/// the HTTP client used for every call.
///
/// The cached token is acquired lazily on the first request and replaced on
/// demand once it is close to expiry. Each request makes at most one
/// acquisition attempt; nothing is retried.
pub struct Session {
    http: Client,
    provider: Box<dyn TokenProvider>,
    token: Option<AccessToken>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider.name())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with the default request timeout
    pub fn new(provider: impl TokenProvider + 'static) -> Result<Self, ApiError> {
        Self::with_timeout(provider, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        provider: impl TokenProvider + 'static,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, provider))
    }

    /// Reuse an existing client. Clone is cheap - reqwest::Client shares its
    /// connection pool.
    pub fn with_client(http: Client, provider: impl TokenProvider + 'static) -> Self {
        Self {
            http,
            provider: Box::new(provider),
            token: None,
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Install a token obtained elsewhere.
    pub fn set_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    /// Forget the cached token; the next request acquires a new one.
    pub fn clear(&mut self) {
        self.token = None;
    }

    /// Check if session holds a token that has not expired
    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().map(|t| !t.is_expired()).unwrap_or(false)
    }

    /// Request a new token from the provider and cache it.
    pub async fn acquire_token(&mut self) -> Result<&AccessToken, AuthError> {
        debug!(provider = self.provider.name(), "Acquiring access token");
        let token = self.provider.request_token(&self.http).await?;
        Ok(self.token.insert(token))
    }

    /// The cached token, acquiring one first if none is cached or the cached
    /// one is due for refresh.
    pub async fn ensure_token(&mut self) -> Result<&AccessToken, AuthError> {
        let usable = self.token.as_ref().is_some_and(|t| !t.needs_refresh());
        if !usable {
            if self.token.is_some() {
                debug!(provider = self.provider.name(), "Access token due for refresh");
            }
            return self.acquire_token().await;
        }
        self.token
            .as_ref()
            .ok_or_else(|| AuthError::InvalidResponse("no cached token".to_string()))
    }

    /// Authorized GET. Non-success statuses become typed errors; a 401 also
    /// drops the cached token.
    pub async fn get(&mut self, url: &str, accept: &str) -> Result<Response, ApiError> {
        let bearer = self.ensure_token().await?.secret().to_string();

        debug!(url = url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&bearer)
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                warn!(url = url, error = %e, "Request failed");
                ApiError::from(e)
            })?;

        self.check_response(url, response).await
    }

    /// Authorized POST with a raw body.
    pub async fn post(
        &mut self,
        url: &str,
        content_type: &str,
        accept: &str,
        body: String,
    ) -> Result<Response, ApiError> {
        let bearer = self.ensure_token().await?.secret().to_string();

        debug!(url = url, bytes = body.len(), "POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(&bearer)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ACCEPT, accept)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = url, error = %e, "Request failed");
                ApiError::from(e)
            })?;

        self.check_response(url, response).await
    }

    /// GET and parse the body as JSON.
    pub async fn get_json(&mut self, url: &str, accept: &str) -> Result<Value, ApiError> {
        let response = self.get(url, accept).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    /// GET the raw body bytes.
    pub async fn get_bytes(&mut self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.get(url, "*/*").await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(&mut self, url: &str, response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        warn!(url = url, status = status.as_u16(), error = %err, "Request returned an error status");

        if err.is_auth_failure() {
            self.clear();
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Hands out `token-1`, `token-2`, ... with a fixed lifetime.
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        lifetime: ChronoDuration,
        fail: bool,
    }

    impl CountingProvider {
        fn new(lifetime: ChronoDuration) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    lifetime,
                    fail: false,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn request_token(&self, _http: &Client) -> Result<AccessToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(AuthError::Rejected {
                    status: 401,
                    error: "invalid_client".into(),
                    description: "bad secret".into(),
                });
            }
            Ok(AccessToken::new(format!("token-{}", n), self.lifetime))
        }
    }

    #[tokio::test]
    async fn test_first_request_acquires_once_and_sends_bearer() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .header("authorization", "Bearer token-1");
            then.status(200).json_body(json!({"ok": true}));
        });

        let (provider, calls) = CountingProvider::new(ChronoDuration::hours(1));
        let mut session = Session::new(provider).unwrap();
        assert!(!session.is_authenticated());

        let value = session.get_json(&server.url("/data"), "application/json").await.unwrap();
        assert_eq!(value["ok"], json!(true));

        session.get_json(&server.url("/data"), "application/json").await.unwrap();

        mock.assert_calls(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_token_due_for_refresh_is_replaced() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .header("authorization", "Bearer token-1");
            then.status(200).json_body(json!({}));
        });

        let (provider, calls) = CountingProvider::new(ChronoDuration::hours(1));
        let mut session = Session::new(provider).unwrap();
        session.set_token(AccessToken::new("stale", ChronoDuration::minutes(1)));

        session.get_json(&server.url("/data"), "application/json").await.unwrap();

        mock.assert();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.token().unwrap().secret(), "token-1");
    }

    #[tokio::test]
    async fn test_failed_acquisition_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200).json_body(json!({}));
        });

        let (mut provider, calls) = CountingProvider::new(ChronoDuration::hours(1));
        provider.fail = true;
        let mut session = Session::new(provider).unwrap();

        let err = session.get_json(&server.url("/data"), "application/json").await.unwrap_err();

        assert!(matches!(err, ApiError::Auth(AuthError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_cached_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(401).body("token expired");
        });

        let (provider, calls) = CountingProvider::new(ChronoDuration::hours(1));
        let mut session = Session::new(provider).unwrap();

        let err = session.get_json(&server.url("/data"), "application/json").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(session.token().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_statuses_are_typed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("List does not exist");
        });
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(503).body("unavailable");
        });
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html></html>");
        });

        let (provider, _) = CountingProvider::new(ChronoDuration::hours(1));
        let mut session = Session::new(provider).unwrap();

        let err = session.get_json(&server.url("/missing"), "application/json").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref body) if body.contains("does not exist")));

        let err = session.get_bytes(&server.url("/broken")).await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError(_)));

        let err = session.get_json(&server.url("/html"), "application/json").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));

        // Non-auth failures keep the token
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_get_bytes_returns_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/file");
            then.status(200).body(vec![0x50u8, 0x4B, 0x03, 0x04]);
        });

        let (provider, _) = CountingProvider::new(ChronoDuration::hours(1));
        let mut session = Session::new(provider).unwrap();
        let bytes = session.get_bytes(&server.url("/file")).await.unwrap();
        assert_eq!(bytes, vec![0x50, 0x4B, 0x03, 0x04]);
    }
}
