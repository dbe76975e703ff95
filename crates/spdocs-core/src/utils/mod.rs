//! URL and path helpers shared by the REST, Graph and resource-context clients.

pub(crate) mod de;
pub mod path;

// Re-export commonly used helpers at module level
pub use path::{encode_segment, encode_segments, quote_odata, ServerRelativePath, SiteAddress};
