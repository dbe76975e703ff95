use serde::{Deserialize, Serialize};

use crate::utils::de::lenient_u64;

/// `BaseTemplate` value of a document library.
pub const DOCUMENT_LIBRARY_TEMPLATE: i64 = 101;

/// A list as returned by `web/lists`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpList {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "ItemCount", default, deserialize_with = "lenient_u64")]
    pub item_count: Option<u64>,
    #[serde(rename = "BaseTemplate", default)]
    pub base_template: Option<i64>,
    #[serde(rename = "DefaultViewUrl", default)]
    pub default_view_url: Option<String>,
}

impl SpList {
    pub fn is_document_library(&self) -> bool {
        self.base_template == Some(DOCUMENT_LIBRARY_TEMPLATE)
    }
}

/// A document library projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentLibrary {
    pub title: String,
    pub id: String,
    pub item_count: u64,
    pub server_relative_url: Option<String>,
}

impl From<SpList> for DocumentLibrary {
    fn from(list: SpList) -> Self {
        Self {
            title: list.title,
            id: list.id,
            item_count: list.item_count.unwrap_or(0),
            server_relative_url: list.default_view_url,
        }
    }
}

/// Keep only document libraries, in their original order. The REST API has
/// no library-only filter, so this runs client-side.
pub fn document_libraries(lists: Vec<SpList>) -> Vec<DocumentLibrary> {
    lists
        .into_iter()
        .filter(SpList::is_document_library)
        .map(DocumentLibrary::from)
        .collect()
}
