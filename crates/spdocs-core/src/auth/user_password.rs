use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::token::read_token_response;
use super::{AccessToken, AuthError, TokenProvider};
use crate::config::DEFAULT_LOGIN_BASE_URL;
use crate::utils::SiteAddress;

/// Resource-owner password grant for organizations that disallow app
/// credentials. Often blocked by MFA or conditional access policies.
pub struct UserPasswordProvider {
    tenant_id: String,
    client_id: String,
    client_secret: Option<String>,
    username: String,
    password: String,
    scope: String,
    login_base_url: String,
}

impl UserPasswordProvider {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: None,
            username: username.into(),
            password: password.into(),
            scope: scope.into(),
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
        }
    }

    /// Provider scoped to a SharePoint site: tenant `{tenant}.onmicrosoft.com`,
    /// scope `https://{host}/.default`.
    pub fn for_site(
        site: &SiteAddress,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(
            format!("{}.onmicrosoft.com", site.tenant_name()),
            client_id,
            username,
            password,
            format!("https://{}/.default", site.host()),
        )
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Confidential app registrations also require the client secret.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_login_base_url(mut self, url: impl Into<String>) -> Self {
        self.login_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base_url, self.tenant_id)
    }
}

#[async_trait]
impl TokenProvider for UserPasswordProvider {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn request_token(&self, http: &Client) -> Result<AccessToken, AuthError> {
        let url = self.token_endpoint();

        let mut params = vec![
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("scope", self.scope.as_str()),
        ];
        if let Some(ref secret) = self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = http.post(&url).form(&params).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "User authentication failed");
            AuthError::from(e)
        })?;

        let token = read_token_response(response).await.map_err(|e| {
            warn!(username = %self.username, error = %e, "User authentication failed");
            e
        })?;

        info!(username = %self.username, "Authenticated as user");
        Ok(token)
    }
}
