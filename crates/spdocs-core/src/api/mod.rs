//! Read surfaces over an authorized [`Session`](crate::auth::Session).
//!
//! - `RestClient`: raw SharePoint REST (`{site}/_api/...`), verbose OData
//! - `GraphClient`: Microsoft Graph sites, drives, items and workbooks
//! - `ClientContext`: queued loads flushed in one round trip (`$batch`)
//! - `SiteClient`: library discovery, file listing, downloads and
//!   spreadsheet conversion on top of a `ClientContext`
//!
//! Every operation returns `Result<_, ApiError>`; non-success statuses map to
//! typed variants and nothing is retried.

pub mod batch;
pub mod context;
pub mod error;
pub mod graph;
pub mod rest;
pub mod site;

pub use context::{ClientContext, LoadHandle};
pub use error::ApiError;
pub use graph::{spreadsheet_items, GraphClient, DEFAULT_RANGE_ADDRESS};
pub use rest::RestClient;
pub use site::SiteClient;

use std::path::Path;

use tracing::debug;

/// Write downloaded bytes to `local_path`, creating parent directories.
/// Returns the number of bytes written.
pub(crate) async fn write_download(local_path: &Path, bytes: &[u8]) -> Result<u64, ApiError> {
    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(local_path, bytes).await?;
    debug!(path = %local_path.display(), bytes = bytes.len(), "Wrote file");
    Ok(bytes.len() as u64)
}
