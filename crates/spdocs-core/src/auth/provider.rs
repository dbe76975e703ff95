use async_trait::async_trait;
use reqwest::Client;

use super::{AccessToken, AuthError};

/// Something that can obtain a bearer token for the target service.
///
/// Implemented by the three supported flows: [`super::AppOnlyProvider`],
/// [`super::ClientCredentialsProvider`] and [`super::UserPasswordProvider`].
/// A provider performs exactly one acquisition attempt per call; caching and
/// refresh decisions belong to [`super::Session`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Request a fresh token using the given HTTP client.
    async fn request_token(&self, http: &Client) -> Result<AccessToken, AuthError>;
}
