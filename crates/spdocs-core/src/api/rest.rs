//! Raw SharePoint REST reads used with the legacy app-only flow.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use super::{write_download, ApiError};
use crate::auth::{AppOnlyProvider, Session};
use crate::utils::{quote_odata, SiteAddress};

/// Verbose OData: entities come back wrapped in `{"d": ...}`.
pub const VERBOSE_JSON: &str = "application/json;odata=verbose";

pub struct RestClient {
    session: Session,
    site: SiteAddress,
}

impl RestClient {
    pub fn new(session: Session, site: SiteAddress) -> Self {
        Self { session, site }
    }

    /// Client authenticated with a SharePoint add-in principal.
    pub fn app_only(
        site_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let site = SiteAddress::parse(site_url)?;
        let provider = AppOnlyProvider::new(site.clone(), client_id, client_secret);
        Ok(Self::new(Session::new(provider)?, site))
    }

    pub fn site(&self) -> &SiteAddress {
        &self.site
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    async fn get(&mut self, relative: &str) -> Result<Value, ApiError> {
        let url = self.site.api_url(relative);
        self.session.get_json(&url, VERBOSE_JSON).await
    }

    /// The site (`web`) entity.
    pub async fn get_web_info(&mut self) -> Result<Value, ApiError> {
        let web = self.get("web").await?;
        info!(site = %self.site, "Read web information");
        Ok(web)
    }

    /// Every list of the site.
    pub async fn get_lists(&mut self) -> Result<Value, ApiError> {
        self.get("web/lists").await
    }

    /// Items of the list with the given title.
    pub async fn get_list_items(&mut self, list_title: &str) -> Result<Value, ApiError> {
        let relative = format!("web/lists/getbytitle('{}')/items", quote_odata(list_title));
        self.get(&relative).await
    }

    /// Items of a document library with their `File` expanded.
    pub async fn get_files_in_library(&mut self, library: &str) -> Result<Value, ApiError> {
        let relative = format!(
            "web/lists/getbytitle('{}')/items?$expand=File",
            quote_odata(library)
        );
        self.get(&relative).await
    }

    /// Raw content of a file addressed by server-relative URL.
    pub async fn download_file(&mut self, server_relative_url: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.site.api_url(&format!(
            "web/getfilebyserverrelativeurl('{}')/$value",
            quote_odata(server_relative_url)
        ));
        let bytes = self.session.get_bytes(&url).await?;
        info!(file = server_relative_url, bytes = bytes.len(), "Downloaded file");
        Ok(bytes)
    }

    /// Download a file and save it at `local_path`, creating parent
    /// directories. Returns the number of bytes written.
    pub async fn download_to(
        &mut self,
        server_relative_url: &str,
        local_path: &Path,
    ) -> Result<u64, ApiError> {
        let bytes = self.download_file(server_relative_url).await?;
        write_download(local_path, &bytes).await
    }
}
