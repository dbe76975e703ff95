use serde::{Deserialize, Serialize};

/// Basic properties of a SharePoint web (site).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebInfo {
    #[serde(rename(deserialize = "Title"))]
    pub title: String,
    #[serde(rename(deserialize = "Url"), default)]
    pub url: Option<String>,
    #[serde(rename(deserialize = "Id"), default)]
    pub id: Option<String>,
    #[serde(rename(deserialize = "ServerRelativeUrl"), default)]
    pub server_relative_url: Option<String>,
}
