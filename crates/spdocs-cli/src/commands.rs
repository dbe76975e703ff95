//! Subcommands: one per library read operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use spdocs_core::api::spreadsheet_items;
use spdocs_core::{Config, GraphClient, RestClient, SiteAddress, SiteClient, Table, WorkbookReader};

use crate::credentials::{session, Audience};

#[derive(Subcommand)]
pub enum Command {
    // ---- SharePoint REST ----
    /// Site (web) properties
    Web,
    /// All lists of the site
    Lists,
    /// Items of a list
    Items {
        list: String,
    },
    /// Items of a document library with file metadata
    LibraryFiles {
        library: String,
    },
    /// Download a file by server-relative URL
    Download {
        server_relative_url: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    // ---- Site context ----
    /// Document libraries of the site
    Libraries,
    /// Files in a library folder
    Files {
        library: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Spreadsheet files in a library folder
    ExcelFiles {
        library: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Download a spreadsheet and print one sheet as a table
    ReadExcel {
        server_relative_url: String,
        #[arg(long)]
        sheet: Option<String>,
        /// Only print the first N rows
        #[arg(long)]
        head: Option<usize>,
    },
    /// List items, optionally projected to some fields
    ListItems {
        list: String,
        /// Comma-separated field names
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    // ---- Microsoft Graph ----
    /// Sites visible to the app
    Sites {
        #[arg(long)]
        search: Option<String>,
    },
    /// Resolve a site from its URL (defaults to --site)
    Site {
        url: Option<String>,
    },
    /// Drives of a site
    Drives {
        site_id: String,
    },
    /// Children of a drive folder
    DriveItems {
        site_id: String,
        drive_id: String,
        #[arg(long)]
        folder: Option<String>,
        /// Only spreadsheet files
        #[arg(long)]
        spreadsheets: bool,
    },
    /// Download a drive item
    GraphDownload {
        site_id: String,
        drive_id: String,
        item_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Worksheets of a workbook
    Worksheets {
        site_id: String,
        drive_id: String,
        item_id: String,
    },
    /// Values of a worksheet range
    Range {
        site_id: String,
        drive_id: String,
        item_id: String,
        worksheet: String,
        /// Range address, e.g. A1:D20
        #[arg(long)]
        address: Option<String>,
    },

    // ---- Local ----
    /// Worksheet names of a local spreadsheet file
    Sheets {
        path: PathBuf,
    },
}

fn rest_client(config: &Config) -> Result<RestClient> {
    let site = SiteAddress::parse(config.require_site_url()?)?;
    Ok(RestClient::new(session(config, Audience::SharePoint)?, site))
}

async fn site_client(config: &Config) -> Result<SiteClient> {
    let site = SiteAddress::parse(config.require_site_url()?)?;
    let mut client = SiteClient::new(session(config, Audience::SharePoint)?, site);
    client.authenticate().await.context("Authentication failed")?;
    Ok(client)
}

fn graph_client(config: &Config) -> Result<GraphClient> {
    Ok(GraphClient::new(session(config, Audience::Graph)?)
        .with_base_url(config.endpoints.graph_base_url.clone()))
}

fn table_head(mut table: Table, head: Option<usize>) -> Table {
    if let Some(n) = head {
        table.rows.truncate(n);
    }
    table
}

async fn local_sheet_names(path: &Path) -> Result<Value> {
    let owned = path.to_path_buf();
    let names = tokio::task::spawn_blocking(move || WorkbookReader::new().sheet_names(&owned))
        .await
        .context("Spreadsheet task failed")??;
    Ok(json!({ "path": path.display().to_string(), "sheets": names }))
}

fn download_summary(path: &Path, bytes: u64) -> Value {
    json!({ "path": path.display().to_string(), "bytes": bytes })
}

/// Run one subcommand and return its result as JSON.
pub async fn run(command: Command, config: &Config) -> Result<Value> {
    let value = match command {
        Command::Web => rest_client(config)?.get_web_info().await?,
        Command::Lists => rest_client(config)?.get_lists().await?,
        Command::Items { list } => rest_client(config)?.get_list_items(&list).await?,
        Command::LibraryFiles { library } => {
            rest_client(config)?.get_files_in_library(&library).await?
        }
        Command::Download {
            server_relative_url,
            output,
        } => {
            let bytes = rest_client(config)?
                .download_to(&server_relative_url, &output)
                .await
                .with_context(|| format!("Failed to download to {}", output.display()))?;
            download_summary(&output, bytes)
        }

        Command::Libraries => {
            let libraries = site_client(config).await?.get_document_libraries().await?;
            serde_json::to_value(libraries)?
        }
        Command::Files { library, folder } => {
            let files = site_client(config)
                .await?
                .get_files_in_library(&library, folder.as_deref())
                .await?;
            serde_json::to_value(files)?
        }
        Command::ExcelFiles { library, folder } => {
            let files = site_client(config)
                .await?
                .get_excel_files(&library, folder.as_deref())
                .await?;
            serde_json::to_value(files)?
        }
        Command::ReadExcel {
            server_relative_url,
            sheet,
            head,
        } => {
            let table = site_client(config)
                .await?
                .download_and_read_excel(&server_relative_url, sheet.as_deref())
                .await?;
            let (rows, columns) = table.shape();
            let table = table_head(table, head);
            json!({ "shape": [rows, columns], "table": table })
        }
        Command::ListItems { list, fields } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let fields = (!fields.is_empty()).then_some(fields.as_slice());
            let items = site_client(config).await?.get_list_items(&list, fields).await?;
            serde_json::to_value(items)?
        }

        Command::Sites { search } => graph_client(config)?.get_sites(search.as_deref()).await?,
        Command::Site { url } => {
            let url = match url {
                Some(url) => url,
                None => config.require_site_url()?.to_string(),
            };
            graph_client(config)?.get_site_by_url(&url).await?
        }
        Command::Drives { site_id } => graph_client(config)?.get_site_drives(&site_id).await?,
        Command::DriveItems {
            site_id,
            drive_id,
            folder,
            spreadsheets,
        } => {
            let listing = graph_client(config)?
                .get_drive_items(&site_id, &drive_id, folder.as_deref())
                .await?;
            if spreadsheets {
                Value::Array(spreadsheet_items(&listing))
            } else {
                listing
            }
        }
        Command::GraphDownload {
            site_id,
            drive_id,
            item_id,
            output,
        } => {
            let bytes = graph_client(config)?
                .download_file(&site_id, &drive_id, &item_id, &output)
                .await?;
            download_summary(&output, bytes)
        }
        Command::Worksheets {
            site_id,
            drive_id,
            item_id,
        } => {
            graph_client(config)?
                .get_worksheets(&site_id, &drive_id, &item_id)
                .await?
        }
        Command::Range {
            site_id,
            drive_id,
            item_id,
            worksheet,
            address,
        } => {
            graph_client(config)?
                .get_range(&site_id, &drive_id, &item_id, &worksheet, address.as_deref())
                .await?
        }

        Command::Sheets { path } => local_sheet_names(&path).await?,
    };
    Ok(value)
}
