//! Authentication module: token providers and the authorized session.
//!
//! This module provides:
//! - `TokenProvider`: one capability with three implementations
//!   (`AppOnlyProvider`, `ClientCredentialsProvider`, `UserPasswordProvider`),
//!   plus `StaticTokenProvider` for tokens obtained elsewhere
//! - `Session`: token caching with expiry-driven refresh and authorized requests
//!
//! Tokens live only in memory and are refreshed five minutes before expiry.

pub mod app_only;
pub mod client_credentials;
pub mod error;
pub mod provider;
pub mod session;
pub mod static_token;
pub mod token;
pub mod user_password;

pub use app_only::{parse_realm, AppOnlyProvider, SHAREPOINT_PRINCIPAL_ID};
pub use client_credentials::{ClientCredentialsProvider, GRAPH_DEFAULT_SCOPE};
pub use error::AuthError;
pub use provider::TokenProvider;
pub use session::{Session, REQUEST_TIMEOUT_SECS};
pub use static_token::StaticTokenProvider;
pub use token::AccessToken;
pub use user_password::UserPasswordProvider;
