//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds the
//! target site, tenant, app registration id, preferred auth flow and endpoint
//! overrides. Secrets are never part of it; they come from the environment or
//! an interactive prompt.
//!
//! Configuration is stored at `~/.config/spdocs/config.json`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "spdocs";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Azure ACS security-token service (legacy app-only flow).
pub const DEFAULT_ACS_BASE_URL: &str = "https://accounts.accesscontrol.windows.net";

/// Microsoft identity platform authority host.
pub const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Microsoft Graph v1.0 root.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SPDOCS_";

/// Which credential flow to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Legacy SharePoint add-in principal against ACS
    AppOnly,
    /// Azure AD app registration, client-credentials grant
    #[default]
    ClientCredentials,
    /// Username and password of a real user
    Password,
}

impl FromStr for AuthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app-only" | "apponly" | "acs" => Ok(Self::AppOnly),
            "client-credentials" | "msal" | "graph" => Ok(Self::ClientCredentials),
            "password" | "user" => Ok(Self::Password),
            other => Err(anyhow::anyhow!("Unknown auth mode: {}", other)),
        }
    }
}

/// Base URLs of the remote services. Overridable for sovereign clouds and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub acs_base_url: String,
    pub login_base_url: String,
    pub graph_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            acs_base_url: DEFAULT_ACS_BASE_URL.to_string(),
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub site_url: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub realm: Option<String>,
    pub auth: Option<AuthMode>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overlay `SPDOCS_*` environment variables onto the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |target: &mut Option<String>, name: &str| {
            if let Some(value) = var(name).filter(|v| !v.trim().is_empty()) {
                *target = Some(value);
            }
        };
        set(&mut self.site_url, "SITE_URL");
        set(&mut self.tenant_id, "TENANT_ID");
        set(&mut self.client_id, "CLIENT_ID");
        set(&mut self.username, "USERNAME");
        set(&mut self.realm, "REALM");

        if let Some(mode) = var("AUTH") {
            self.auth = Some(mode.parse()?);
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}REQUEST_TIMEOUT_SECS: {}", ENV_PREFIX, secs))?;
            self.request_timeout_secs = Some(secs);
        }
        if let Some(url) = var("ACS_BASE_URL") {
            self.endpoints.acs_base_url = url;
        }
        if let Some(url) = var("LOGIN_BASE_URL") {
            self.endpoints.login_base_url = url;
        }
        if let Some(url) = var("GRAPH_BASE_URL") {
            self.endpoints.graph_base_url = url;
        }
        Ok(())
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth.unwrap_or_default()
    }

    pub fn require_site_url(&self) -> Result<&str> {
        self.site_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No site URL configured (set {}SITE_URL)", ENV_PREFIX))
    }

    pub fn require_tenant_id(&self) -> Result<&str> {
        self.tenant_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No tenant id configured (set {}TENANT_ID)", ENV_PREFIX))
    }

    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No client id configured (set {}CLIENT_ID)", ENV_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_auth_mode_parsing() {
        assert_eq!("app-only".parse::<AuthMode>().unwrap(), AuthMode::AppOnly);
        assert_eq!("Client-Credentials".parse::<AuthMode>().unwrap(), AuthMode::ClientCredentials);
        assert_eq!("password".parse::<AuthMode>().unwrap(), AuthMode::Password);
        assert!("kerberos".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_apply_vars_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SITE_URL", "https://contoso.sharepoint.com/sites/team"),
            ("CLIENT_ID", "app"),
            ("AUTH", "password"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("GRAPH_BASE_URL", "http://localhost:9000/v1.0"),
            ("TENANT_ID", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            tenant_id: Some("from-file".into()),
            ..Default::default()
        };
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.require_site_url().unwrap(), "https://contoso.sharepoint.com/sites/team");
        assert_eq!(config.require_client_id().unwrap(), "app");
        assert_eq!(config.tenant_id.as_deref(), Some("from-file"));
        assert_eq!(config.auth_mode(), AuthMode::Password);
        assert_eq!(config.request_timeout_secs, Some(5));
        assert_eq!(config.endpoints.graph_base_url, "http://localhost:9000/v1.0");
        assert_eq!(config.endpoints.login_base_url, DEFAULT_LOGIN_BASE_URL);
    }

    #[test]
    fn test_apply_vars_rejects_bad_timeout() {
        let mut config = Config::default();
        let result = config.apply_vars(|name| (name == "REQUEST_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_round_trip_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            site_url: Some("https://contoso.sharepoint.com/sites/team".into()),
            auth: Some(AuthMode::AppOnly),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"app-only\""));

        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(Config::load_from(&dir.path().join("absent.json")).unwrap(), Config::default());
    }

    #[test]
    fn test_missing_values_are_reported() {
        let config = Config::default();
        assert!(config.require_site_url().is_err());
        assert_eq!(config.auth_mode(), AuthMode::ClientCredentials);
    }
}
