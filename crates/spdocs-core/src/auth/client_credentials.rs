use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::token::read_token_response;
use super::{AccessToken, AuthError, TokenProvider};
use crate::config::DEFAULT_LOGIN_BASE_URL;

/// Default scope for Microsoft Graph application permissions.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// OAuth2 client-credentials grant against the Microsoft identity platform
/// v2.0 token endpoint (`{login}/{tenant}/oauth2/v2.0/token`).
pub struct ClientCredentialsProvider {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    login_base_url: String,
}

impl ClientCredentialsProvider {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
        }
    }

    /// Override the scope, e.g. `https://contoso.sharepoint.com/.default`.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_login_base_url(mut self, url: impl Into<String>) -> Self {
        self.login_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base_url, self.tenant_id)
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    fn name(&self) -> &'static str {
        "client-credentials"
    }

    async fn request_token(&self, http: &Client) -> Result<AccessToken, AuthError> {
        let url = self.token_endpoint();

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Error acquiring access token");
                AuthError::from(e)
            })?;

        let token = read_token_response(response).await.map_err(|e| {
            warn!(error = %e, "Authentication failed");
            e
        })?;

        info!(scope = %self.scope, "Acquired access token using client credentials");
        Ok(token)
    }
}
