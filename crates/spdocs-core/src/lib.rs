//! Core library for spdocs.
//!
//! Authenticates against SharePoint Online / Microsoft Graph with one of three
//! token providers and exposes read operations on top of an authorized
//! [`auth::Session`]:
//!
//! - [`api::RestClient`]: raw SharePoint REST reads
//! - [`api::GraphClient`]: Graph sites, drives, items and workbook ranges
//! - [`api::SiteClient`]: batched resource-context reads, library discovery
//!   and spreadsheet conversion

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod tabular;
pub mod utils;

pub use api::{ApiError, ClientContext, GraphClient, LoadHandle, RestClient, SiteClient};
pub use auth::{
    AccessToken, AppOnlyProvider, AuthError, ClientCredentialsProvider, Session,
    StaticTokenProvider, TokenProvider, UserPasswordProvider,
};
pub use config::{AuthMode, Config, Endpoints};
pub use models::{DocumentLibrary, FileInfo, WebInfo};
pub use tabular::{Cell, Table, TabularError, TabularReader, WorkbookReader};
pub use utils::{ServerRelativePath, SiteAddress};
