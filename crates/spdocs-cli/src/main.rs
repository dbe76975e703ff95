//! spdocs - read SharePoint sites, document libraries, lists and workbooks
//! from the command line.
//!
//! Results are printed to stdout as pretty JSON; diagnostics go to stderr
//! (and optionally a log file) through `tracing`.

mod commands;
mod credentials;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spdocs_core::{AuthMode, Config};

use commands::Command;

/// Log file name inside `--log-dir`
const LOG_FILE_NAME: &str = "spdocs.log";

#[derive(Parser)]
#[command(name = "spdocs", version, about = "Read SharePoint sites, libraries, lists and workbooks")]
#[command(propagate_version = true)]
struct Cli {
    /// SharePoint site URL, e.g. https://contoso.sharepoint.com/sites/team
    #[arg(long, global = true)]
    site: Option<String>,

    /// Credential flow: app-only, client-credentials or password
    #[arg(long, global = true)]
    auth: Option<String>,

    /// Azure AD tenant id or domain
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// Application (client) id
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Username for the password flow
    #[arg(long, global = true)]
    username: Option<String>,

    /// Alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Config file, then `SPDOCS_*` variables, then command-line flags.
    fn load_config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        config.apply_env()?;

        if let Some(ref site) = self.site {
            config.site_url = Some(site.clone());
        }
        if let Some(ref auth) = self.auth {
            config.auth = Some(auth.parse::<AuthMode>()?);
        }
        if let Some(ref tenant) = self.tenant {
            config.tenant_id = Some(tenant.clone());
        }
        if let Some(ref client_id) = self.client_id {
            config.client_id = Some(client_id.clone());
        }
        if let Some(ref username) = self.username {
            config.username = Some(username.clone());
        }
        Ok(config)
    }
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    let config = cli.load_config()?;
    info!(auth = ?config.auth_mode(), "spdocs starting");

    let output = commands::run(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
