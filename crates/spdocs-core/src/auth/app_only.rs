//! SharePoint add-in ("app-only") authentication against the Azure ACS
//! security-token service.
//!
//! The flow:
//! 1. Discover the tenant realm from the `WWW-Authenticate` challenge of
//!    `{site}/_vti_bin/client.svc` (falls back to `{tenant}.sharepoint.com`).
//! 2. POST a client-credentials grant to
//!    `{acs}/{realm}/tokens/OAuth/2` with a `{client_id}@{realm}` principal
//!    and a `{sharepoint principal}/{host}@{realm}` resource.

use async_trait::async_trait;
use reqwest::{header, Client};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::token::read_token_response;
use super::{AccessToken, AuthError, TokenProvider};
use crate::config::DEFAULT_ACS_BASE_URL;
use crate::utils::SiteAddress;

/// Well-known principal id of SharePoint Online.
pub const SHAREPOINT_PRINCIPAL_ID: &str = "00000003-0000-0ff1-ce00-000000000000";

/// Endpoint whose 401 challenge advertises the realm.
const REALM_DISCOVERY_PATH: &str = "_vti_bin/client.svc";

/// Extract the `realm="..."` value from a `WWW-Authenticate` header.
pub fn parse_realm(header_value: &str) -> Option<String> {
    let lower = header_value.to_ascii_lowercase();
    let start = lower.find("realm=\"")? + "realm=\"".len();
    let rest = &header_value[start..];
    let end = rest.find('"')?;
    let realm = rest[..end].trim();
    if realm.is_empty() {
        None
    } else {
        Some(realm.to_string())
    }
}

pub struct AppOnlyProvider {
    site: SiteAddress,
    client_id: String,
    client_secret: String,
    acs_base_url: String,
    realm: OnceCell<String>,
}

impl AppOnlyProvider {
    pub fn new(site: SiteAddress, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            site,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            acs_base_url: DEFAULT_ACS_BASE_URL.to_string(),
            realm: OnceCell::new(),
        }
    }

    /// Use a known realm (tenant id) and skip discovery.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = OnceCell::from(realm.into());
        self
    }

    pub fn with_acs_base_url(mut self, url: impl Into<String>) -> Self {
        self.acs_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn site(&self) -> &SiteAddress {
        &self.site
    }

    /// Realm used when discovery yields nothing.
    pub fn fallback_realm(&self) -> String {
        format!("{}.sharepoint.com", self.site.tenant_name())
    }

    /// Best-effort realm discovery. Never fails: any transport problem or a
    /// missing challenge header falls back to [`Self::fallback_realm`].
    pub async fn resolve_realm(&self, http: &Client) -> String {
        let url = format!("{}/{}", self.site, REALM_DISCOVERY_PATH);

        let response = match http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Could not determine realm automatically");
                return self.fallback_realm();
            }
        };

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_realm);

        match challenge {
            Some(realm) => {
                debug!(realm = %realm, "Realm discovered from WWW-Authenticate");
                realm
            }
            None => {
                debug!(status = %response.status(), "No realm in challenge, using fallback");
                self.fallback_realm()
            }
        }
    }

    /// The realm for this provider, discovered once and then reused.
    pub async fn realm(&self, http: &Client) -> &str {
        self.realm
            .get_or_init(|| self.resolve_realm(http))
            .await
            .as_str()
    }

    fn principal(&self, realm: &str) -> String {
        format!("{}@{}", self.client_id, realm)
    }

    fn resource(&self, realm: &str) -> String {
        format!("{}/{}@{}", SHAREPOINT_PRINCIPAL_ID, self.site.authority(), realm)
    }

    fn token_url(&self, realm: &str) -> String {
        format!("{}/{}/tokens/OAuth/2", self.acs_base_url, realm)
    }
}

#[async_trait]
impl TokenProvider for AppOnlyProvider {
    fn name(&self) -> &'static str {
        "app-only"
    }

    async fn request_token(&self, http: &Client) -> Result<AccessToken, AuthError> {
        let realm = self.realm(http).await.to_string();
        let url = self.token_url(&realm);
        let principal = self.principal(&realm);
        let resource = self.resource(&realm);

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", principal.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("resource", resource.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Error getting access token");
                AuthError::from(e)
            })?;

        let token = read_token_response(response).await.map_err(|e| {
            warn!(error = %e, "Failed to get access token");
            e
        })?;

        info!(realm = %realm, "Obtained access token using app-only authentication");
        Ok(token)
    }
}
