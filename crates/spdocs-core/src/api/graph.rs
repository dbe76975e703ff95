//! Microsoft Graph reads: sites, drives, drive items and workbook ranges.

use std::path::Path;

use serde_json::Value;
use tracing::info;
use url::Url;

use super::{write_download, ApiError};
use crate::auth::{ClientCredentialsProvider, Session};
use crate::config::DEFAULT_GRAPH_BASE_URL;
use crate::tabular::is_spreadsheet_name;
use crate::utils::{encode_segments, quote_odata, SiteAddress};

const GRAPH_JSON: &str = "application/json";

/// Range read when the caller gives no address.
pub const DEFAULT_RANGE_ADDRESS: &str = "A1:Z1000";

pub struct GraphClient {
    session: Session,
    base_url: String,
}

impl GraphClient {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
        }
    }

    /// Client authenticated with an app registration (client-credentials grant).
    pub fn client_credentials(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let provider = ClientCredentialsProvider::new(tenant_id, client_id, client_secret);
        Ok(Self::new(Session::new(provider)?))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative)
    }

    fn drive_url(site_id: &str, drive_id: &str) -> String {
        format!("sites/{}/drives/{}", site_id, drive_id)
    }

    async fn get(&mut self, relative: &str) -> Result<Value, ApiError> {
        let url = self.url(relative);
        self.session.get_json(&url, GRAPH_JSON).await
    }

    /// Sites visible to the app, optionally narrowed by a search term.
    pub async fn get_sites(&mut self, search: Option<&str>) -> Result<Value, ApiError> {
        let base = self.url("sites");
        let url = match search {
            Some(term) => Url::parse_with_params(&base, &[("search", term)])
                .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?
                .to_string(),
            None => base,
        };
        self.session.get_json(&url, GRAPH_JSON).await
    }

    /// Resolve a site from its web address (`sites/{host}:{path}`).
    pub async fn get_site_by_url(&mut self, site_url: &str) -> Result<Value, ApiError> {
        let site = SiteAddress::parse(site_url)?;
        let value = self.get(&format!("sites/{}", site.graph_site_id())).await?;
        info!(site = %site, "Resolved site");
        Ok(value)
    }

    pub async fn get_site_drives(&mut self, site_id: &str) -> Result<Value, ApiError> {
        self.get(&format!("sites/{}/drives", site_id)).await
    }

    /// Children of the drive root, or of a folder addressed by path.
    pub async fn get_drive_items(
        &mut self,
        site_id: &str,
        drive_id: &str,
        folder_path: Option<&str>,
    ) -> Result<Value, ApiError> {
        let drive = Self::drive_url(site_id, drive_id);
        let relative = match folder_path.map(encode_segments).filter(|p| !p.is_empty()) {
            Some(path) => format!("{}/root:/{}:/children", drive, path),
            None => format!("{}/root/children", drive),
        };
        self.get(&relative).await
    }

    /// Content of a drive item.
    pub async fn download_bytes(
        &mut self,
        site_id: &str,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.url(&format!(
            "{}/items/{}/content",
            Self::drive_url(site_id, drive_id),
            item_id
        ));
        self.session.get_bytes(&url).await
    }

    /// Download a drive item to `local_path`; returns the bytes written.
    pub async fn download_file(
        &mut self,
        site_id: &str,
        drive_id: &str,
        item_id: &str,
        local_path: &Path,
    ) -> Result<u64, ApiError> {
        let bytes = self.download_bytes(site_id, drive_id, item_id).await?;
        let written = write_download(local_path, &bytes).await?;
        info!(item = item_id, path = %local_path.display(), bytes = written, "Downloaded file");
        Ok(written)
    }

    pub async fn get_worksheets(
        &mut self,
        site_id: &str,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Value, ApiError> {
        self.get(&format!(
            "{}/items/{}/workbook/worksheets",
            Self::drive_url(site_id, drive_id),
            item_id
        ))
        .await
    }

    /// Cell values of a worksheet range (default [`DEFAULT_RANGE_ADDRESS`]).
    pub async fn get_range(
        &mut self,
        site_id: &str,
        drive_id: &str,
        item_id: &str,
        worksheet: &str,
        address: Option<&str>,
    ) -> Result<Value, ApiError> {
        let address = address.unwrap_or(DEFAULT_RANGE_ADDRESS);
        self.get(&format!(
            "{}/items/{}/workbook/worksheets('{}')/range(address='{}')",
            Self::drive_url(site_id, drive_id),
            item_id,
            quote_odata(worksheet),
            quote_odata(address)
        ))
        .await
    }
}

/// Spreadsheet entries of a drive-item listing, in listing order.
pub fn spreadsheet_items(listing: &Value) -> Vec<Value> {
    listing
        .get("value")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| {
                    item.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(is_spreadsheet_name)
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
