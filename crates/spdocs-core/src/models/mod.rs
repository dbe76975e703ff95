//! Typed projections of SharePoint resources.
//!
//! - `WebInfo`: the site returned by `authenticate()`
//! - `SpList`, `DocumentLibrary`: list metadata and the library projection
//! - `FileInfo`: files inside a library folder
//!
//! REST and Graph reads return plain `serde_json::Value` records instead.

pub mod file;
pub mod list;
pub mod web;

pub use file::FileInfo;
pub use list::{document_libraries, DocumentLibrary, SpList, DOCUMENT_LIBRARY_TEMPLATE};
pub use web::WebInfo;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::ApiError;

/// Extract the entries of an OData collection. Accepts the `nometadata`
/// shape (`{"value": [...]}`), the `verbose` shape (`{"d": {"results": [...]}}`)
/// and a bare array.
pub fn collection_entries(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("value") {
                return Ok(items);
            }
            if let Some(Value::Object(mut d)) = map.remove("d") {
                if let Some(Value::Array(items)) = d.remove("results") {
                    return Ok(items);
                }
            }
            Err(ApiError::InvalidResponse(
                "Expected an OData collection with a value array".to_string(),
            ))
        }
        other => Err(ApiError::InvalidResponse(format!(
            "Expected an OData collection, got {}",
            other
        ))),
    }
}

/// Deserialize every entry of an OData collection.
pub fn parse_collection<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    collection_entries(value)?
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|e| ApiError::InvalidResponse(format!("Unexpected entry shape: {}", e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_entries_shapes() {
        let nometadata = json!({"value": [{"Title": "a"}, {"Title": "b"}]});
        assert_eq!(collection_entries(nometadata).unwrap().len(), 2);

        let verbose = json!({"d": {"results": [{"Title": "a"}]}});
        assert_eq!(collection_entries(verbose).unwrap().len(), 1);

        assert_eq!(collection_entries(json!([1, 2, 3])).unwrap().len(), 3);
        assert!(collection_entries(json!({"Title": "single"})).is_err());
        assert!(collection_entries(json!("text")).is_err());
    }
}
