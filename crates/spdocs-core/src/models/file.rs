use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tabular::is_spreadsheet_name;
use crate::utils::de::lenient_u64;

/// A file inside a document library folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    #[serde(rename(deserialize = "Name"))]
    pub name: String,
    #[serde(rename(deserialize = "ServerRelativeUrl"))]
    pub server_relative_url: String,
    #[serde(rename(deserialize = "Length"), default, deserialize_with = "lenient_u64")]
    pub size: Option<u64>,
    #[serde(rename(deserialize = "TimeCreated"), default)]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(rename(deserialize = "TimeLastModified"), default)]
    pub time_last_modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn is_spreadsheet(&self) -> bool {
        is_spreadsheet_name(&self.name)
    }
}
