//! Site reads through a [`ClientContext`]: library discovery, file listing,
//! downloads, spreadsheet conversion and list items.
//!
//! Every operation except [`SiteClient::authenticate`] requires a prior
//! successful `authenticate()` and fails with [`ApiError::NotAuthenticated`]
//! otherwise.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::context::ClientContext;
use super::{write_download, ApiError};
use crate::auth::{AppOnlyProvider, Session, UserPasswordProvider};
use crate::models::{collection_entries, document_libraries, parse_collection, DocumentLibrary, FileInfo, SpList, WebInfo};
use crate::tabular::{read_table, Table, TabularReader, WorkbookReader};
use crate::utils::{encode_segment, quote_odata, ServerRelativePath, SiteAddress};

/// Extension used for the temporary copy when the URL has none.
const DEFAULT_SPREADSHEET_SUFFIX: &str = ".xlsx";

pub struct SiteClient {
    ctx: ClientContext,
    reader: Arc<dyn TabularReader>,
    web: Option<WebInfo>,
}

impl SiteClient {
    pub fn new(session: Session, site: SiteAddress) -> Self {
        Self {
            ctx: ClientContext::new(session, site),
            reader: Arc::new(WorkbookReader::new()),
            web: None,
        }
    }

    /// App principal with a client secret (ACS app-only flow).
    pub fn with_client_secret(
        site_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let site = SiteAddress::parse(site_url)?;
        let provider = AppOnlyProvider::new(site.clone(), client_id, client_secret);
        Ok(Self::new(Session::new(provider)?, site))
    }

    /// Real user signing in with username and password.
    pub fn with_user_password(
        site_url: &str,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let site = SiteAddress::parse(site_url)?;
        let provider = UserPasswordProvider::for_site(&site, client_id, username, password);
        Ok(Self::new(Session::new(provider)?, site))
    }

    /// Replace the spreadsheet reader used by `download_and_read_excel`.
    pub fn with_reader(mut self, reader: Arc<dyn TabularReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn site(&self) -> &SiteAddress {
        self.ctx.site()
    }

    pub fn context(&mut self) -> &mut ClientContext {
        &mut self.ctx
    }

    /// The web read by the last successful `authenticate()`.
    pub fn web(&self) -> Option<&WebInfo> {
        self.web.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.web.is_some()
    }

    fn require_auth(&self) -> Result<(), ApiError> {
        if self.web.is_none() {
            warn!("Not authenticated. Call authenticate() first.");
            return Err(ApiError::NotAuthenticated);
        }
        Ok(())
    }

    /// Acquire a token and verify it by reading the web.
    pub async fn authenticate(&mut self) -> Result<WebInfo, ApiError> {
        self.web = None;
        let provider = self.ctx.session().provider_name();

        let result: Result<WebInfo, ApiError> = async {
            self.ctx.session_mut().ensure_token().await?;
            let value = self.ctx.fetch("web?$select=Title,Url,Id,ServerRelativeUrl").await?;
            serde_json::from_value::<WebInfo>(value)
                .map_err(|e| ApiError::InvalidResponse(format!("Unexpected web shape: {}", e)))
        }
        .await;

        match result {
            Ok(web) => {
                info!(provider, title = %web.title, "Successfully authenticated to SharePoint site");
                self.web = Some(web.clone());
                Ok(web)
            }
            Err(e) => {
                warn!(provider, error = %e, "Authentication failed");
                Err(e)
            }
        }
    }

    /// Lists whose base template is the document library, in site order.
    pub async fn get_document_libraries(&mut self) -> Result<Vec<DocumentLibrary>, ApiError> {
        self.require_auth()?;
        let value = self
            .ctx
            .fetch("web/lists?$select=Title,Id,ItemCount,BaseTemplate,DefaultViewUrl")
            .await?;
        let lists: Vec<SpList> = parse_collection(value)?;
        Ok(document_libraries(lists))
    }

    fn files_endpoint(&self, library: &str, folder_path: Option<&str>) -> String {
        match folder_path.filter(|p| !p.trim_matches('/').is_empty()) {
            Some(folder) => {
                let path = ServerRelativePath::new()
                    .join(&self.site().decoded_path())
                    .join(library)
                    .join(folder);
                format!(
                    "web/GetFolderByServerRelativePath(decodedurl='{}')/Files",
                    quote_odata(&path.to_string())
                )
            }
            None => format!("web/lists/getbytitle('{}')/RootFolder/Files", quote_odata(library)),
        }
    }

    /// Files in the library root, or in a folder below it.
    pub async fn get_files_in_library(
        &mut self,
        library: &str,
        folder_path: Option<&str>,
    ) -> Result<Vec<FileInfo>, ApiError> {
        self.require_auth()?;
        let relative = self.files_endpoint(library, folder_path);
        let value = self.ctx.fetch(&relative).await?;
        parse_collection(value)
    }

    /// Spreadsheet files (xlsx, xls, xlsm) in a library folder.
    pub async fn get_excel_files(
        &mut self,
        library: &str,
        folder_path: Option<&str>,
    ) -> Result<Vec<FileInfo>, ApiError> {
        let files = self.get_files_in_library(library, folder_path).await?;
        Ok(files.into_iter().filter(FileInfo::is_spreadsheet).collect())
    }

    async fn download_bytes(&mut self, server_relative_url: &str) -> Result<Vec<u8>, ApiError> {
        self.require_auth()?;
        let url = self.site().api_url(&format!(
            "web/getfilebyserverrelativeurl('{}')/$value",
            quote_odata(server_relative_url)
        ));
        self.ctx.session_mut().get_bytes(&url).await
    }

    /// Download a file to `local_path`; returns the bytes written.
    pub async fn download_file(
        &mut self,
        server_relative_url: &str,
        local_path: &Path,
    ) -> Result<u64, ApiError> {
        let bytes = self.download_bytes(server_relative_url).await?;
        let written = write_download(local_path, &bytes).await?;
        info!(file = server_relative_url, path = %local_path.display(), bytes = written, "File downloaded");
        Ok(written)
    }

    /// Download a spreadsheet into a temporary file and read one sheet
    /// (default the first). The temporary file is removed before returning.
    pub async fn download_and_read_excel(
        &mut self,
        server_relative_url: &str,
        sheet: Option<&str>,
    ) -> Result<Table, ApiError> {
        let bytes = self.download_bytes(server_relative_url).await?;

        let suffix = Path::new(server_relative_url)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_else(|| DEFAULT_SPREADSHEET_SUFFIX.to_string());
        let temp = tempfile::Builder::new()
            .prefix("spdocs-")
            .suffix(&suffix)
            .tempfile()?;
        tokio::fs::write(temp.path(), &bytes).await?;

        let table = read_table(
            Arc::clone(&self.reader),
            temp.path().to_path_buf(),
            sheet.map(str::to_string),
        )
        .await?;

        let (rows, columns) = table.shape();
        info!(file = server_relative_url, sheet = %table.sheet, rows, columns, "Excel file read successfully");
        Ok(table)
    }

    /// Items of a list. With `fields`, each item carries exactly those keys
    /// (missing values as null); without, every property is returned.
    pub async fn get_list_items(
        &mut self,
        list: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Map<String, Value>>, ApiError> {
        self.require_auth()?;
        let fields = fields.filter(|f| !f.is_empty());

        let mut relative = format!("web/lists/getbytitle('{}')/items", quote_odata(list));
        if let Some(fields) = fields {
            let select: Vec<String> = fields.iter().map(|f| encode_segment(f)).collect();
            relative.push_str(&format!("?$select={}", select.join(",")));
        }

        let entries = collection_entries(self.ctx.fetch(&relative).await?)?;
        let items = entries
            .into_iter()
            .map(|entry| {
                let properties = match entry {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                match fields {
                    Some(fields) => fields
                        .iter()
                        .map(|f| (f.to_string(), properties.get(*f).cloned().unwrap_or(Value::Null)))
                        .collect(),
                    None => properties,
                }
            })
            .collect();
        Ok(items)
    }
}
