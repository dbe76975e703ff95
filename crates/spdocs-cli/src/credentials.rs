//! Builds an authorized [`Session`] from the configuration.
//!
//! Secrets never come from the config file: they are read from
//! `SPDOCS_CLIENT_SECRET` / `SPDOCS_PASSWORD` or prompted for.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

use spdocs_core::auth::{GRAPH_DEFAULT_SCOPE, REQUEST_TIMEOUT_SECS};
use spdocs_core::{
    AppOnlyProvider, AuthMode, ClientCredentialsProvider, Config, Session, SiteAddress,
    UserPasswordProvider,
};

const CLIENT_SECRET_VAR: &str = "SPDOCS_CLIENT_SECRET";
const PASSWORD_VAR: &str = "SPDOCS_PASSWORD";

/// Which service the token is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// SharePoint REST (`{site}/_api`)
    SharePoint,
    /// Microsoft Graph
    Graph,
}

fn secret_from_env_or_prompt(var: &str, prompt: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => rpassword::prompt_password(prompt)
            .with_context(|| format!("Failed to read secret (or set {})", var)),
    }
}

fn client_secret() -> Result<String> {
    secret_from_env_or_prompt(CLIENT_SECRET_VAR, "Client secret: ")
}

/// Scope requested by the identity-platform flows.
pub fn scope_for(audience: Audience, site: Option<&SiteAddress>) -> Result<String> {
    match audience {
        Audience::Graph => Ok(GRAPH_DEFAULT_SCOPE.to_string()),
        Audience::SharePoint => {
            let site = site.context("A site URL is required for SharePoint reads")?;
            Ok(format!("https://{}/.default", site.host()))
        }
    }
}

fn site(config: &Config) -> Result<Option<SiteAddress>> {
    config
        .site_url
        .as_deref()
        .map(SiteAddress::parse)
        .transpose()
        .context("Invalid site URL")
}

pub fn session(config: &Config, audience: Audience) -> Result<Session> {
    let timeout = Duration::from_secs(config.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS));
    let site = site(config)?;
    let client_id = config.require_client_id()?.to_string();
    let endpoints = &config.endpoints;
    let mode = config.auth_mode();

    debug!(?mode, ?audience, "Building session");

    let session = match mode {
        AuthMode::AppOnly => {
            if audience == Audience::Graph {
                bail!("App-only (ACS) tokens are not accepted by Microsoft Graph; use --auth client-credentials");
            }
            let site = site.context("A site URL is required for app-only authentication")?;
            let mut provider = AppOnlyProvider::new(site, client_id, client_secret()?)
                .with_acs_base_url(endpoints.acs_base_url.clone());
            if let Some(ref realm) = config.realm {
                provider = provider.with_realm(realm.clone());
            }
            Session::with_timeout(provider, timeout)?
        }
        AuthMode::ClientCredentials => {
            let scope = scope_for(audience, site.as_ref())?;
            let provider = ClientCredentialsProvider::new(config.require_tenant_id()?, client_id, client_secret()?)
                .with_scope(scope)
                .with_login_base_url(endpoints.login_base_url.clone());
            Session::with_timeout(provider, timeout)?
        }
        AuthMode::Password => {
            let username = config
                .username
                .clone()
                .context("No username configured (set SPDOCS_USERNAME or --username)")?;
            let password = secret_from_env_or_prompt(PASSWORD_VAR, &format!("Password for {}: ", username))?;
            let scope = scope_for(audience, site.as_ref())?;
            let tenant = match (config.tenant_id.clone(), site.as_ref()) {
                (Some(tenant), _) => tenant,
                (None, Some(site)) => format!("{}.onmicrosoft.com", site.tenant_name()),
                (None, None) => bail!("No tenant id configured (set SPDOCS_TENANT_ID)"),
            };
            let mut provider = UserPasswordProvider::new(tenant, client_id, username, password, scope)
                .with_login_base_url(endpoints.login_base_url.clone());
            if let Ok(secret) = std::env::var(CLIENT_SECRET_VAR) {
                if !secret.is_empty() {
                    provider = provider.with_client_secret(secret);
                }
            }
            Session::with_timeout(provider, timeout)?
        }
    };
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_audience() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/team").unwrap();
        assert_eq!(
            scope_for(Audience::SharePoint, Some(&site)).unwrap(),
            "https://contoso.sharepoint.com/.default"
        );
        assert_eq!(scope_for(Audience::Graph, None).unwrap(), GRAPH_DEFAULT_SCOPE);
        assert!(scope_for(Audience::SharePoint, None).is_err());
    }

    #[test]
    fn test_app_only_is_rejected_for_graph() {
        let config = Config {
            site_url: Some("https://contoso.sharepoint.com/sites/team".into()),
            client_id: Some("app".into()),
            auth: Some(AuthMode::AppOnly),
            ..Default::default()
        };
        assert!(session(&config, Audience::Graph).is_err());
    }

    #[test]
    fn test_missing_client_id_is_reported() {
        let config = Config::default();
        let err = session(&config, Audience::Graph).unwrap_err();
        assert!(err.to_string().contains("client id"));
    }
}
