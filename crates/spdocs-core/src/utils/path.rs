use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::api::ApiError;

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside an OData string literal. Slashes stay intact so
/// server-relative URLs keep their shape.
const ODATA_LITERAL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode one path segment (slashes included).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Split a slash-separated path into segments, encode each and re-join.
/// Empty segments are dropped, so leading, trailing and doubled slashes vanish.
pub fn encode_segments(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Prepare a value for an OData function-call literal such as
/// `getbytitle('{value}')`: single quotes are doubled, then URL-unsafe
/// characters are percent-encoded.
pub fn quote_odata(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    utf8_percent_encode(&escaped, ODATA_LITERAL).to_string()
}

/// An absolute SharePoint site address, e.g. `https://contoso.sharepoint.com/sites/team`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    url: Url,
    base: String,
}

impl SiteAddress {
    pub fn parse(site_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(site_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", site_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: expected an http(s) site address",
                site_url
            )));
        }
        if url.host_str().is_none() {
            return Err(ApiError::InvalidUrl(format!("{}: missing host", site_url)));
        }

        let base = format!(
            "{}://{}{}",
            url.scheme(),
            Self::authority_of(&url),
            url.path().trim_end_matches('/')
        );
        Ok(Self { url, base })
    }

    fn authority_of(url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Host name without port.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Host name including a non-default port.
    pub fn authority(&self) -> String {
        Self::authority_of(&self.url)
    }

    /// First label of the host: `contoso` for `contoso.sharepoint.com`.
    pub fn tenant_name(&self) -> &str {
        self.host().split('.').next().unwrap_or_default()
    }

    /// Site path without trailing slash; empty for a tenant root site.
    pub fn server_relative_path(&self) -> &str {
        self.url.path().trim_end_matches('/')
    }

    /// Site path as SharePoint stores it, percent-escapes decoded. Use this
    /// wherever the path is embedded in an OData literal.
    pub fn decoded_path(&self) -> String {
        percent_decode_str(self.server_relative_path())
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Graph compound site identifier: `host:/sites/name`.
    pub fn graph_site_id(&self) -> String {
        let path = self.server_relative_path();
        if path.is_empty() {
            self.host().to_string()
        } else {
            format!("{}:{}", self.host(), path)
        }
    }

    /// `{site}/_api/{relative}`.
    pub fn api_url(&self, relative: &str) -> String {
        format!("{}/_api/{}", self.base, relative.trim_start_matches('/'))
    }

    /// Site URL with any trailing slash removed.
    pub fn as_str(&self) -> &str {
        &self.base
    }
}

impl fmt::Display for SiteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// A server-relative path assembled from structured segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRelativePath {
    segments: Vec<String>,
}

impl ServerRelativePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every non-empty segment of a slash-separated path.
    pub fn join(mut self, path: &str) -> Self {
        self.segments.extend(
            path.split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ServerRelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_address_components() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/teamsite/").unwrap();
        assert_eq!(site.host(), "contoso.sharepoint.com");
        assert_eq!(site.tenant_name(), "contoso");
        assert_eq!(site.server_relative_path(), "/sites/teamsite");
        assert_eq!(site.as_str(), "https://contoso.sharepoint.com/sites/teamsite");
        assert_eq!(
            site.api_url("web/lists"),
            "https://contoso.sharepoint.com/sites/teamsite/_api/web/lists"
        );
    }

    #[test]
    fn test_decoded_path_undoes_url_escaping() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/team site/").unwrap();
        assert_eq!(site.server_relative_path(), "/sites/team%20site");
        assert_eq!(site.decoded_path(), "/sites/team site");

        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/équipe").unwrap();
        assert_eq!(site.decoded_path(), "/sites/équipe");

        let plain = SiteAddress::parse("https://contoso.sharepoint.com/sites/teamsite").unwrap();
        assert_eq!(plain.decoded_path(), "/sites/teamsite");
    }

    #[test]
    fn test_graph_site_id() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/teamsite").unwrap();
        assert_eq!(site.graph_site_id(), "contoso.sharepoint.com:/sites/teamsite");

        let root = SiteAddress::parse("https://contoso.sharepoint.com").unwrap();
        assert_eq!(root.graph_site_id(), "contoso.sharepoint.com");
        assert_eq!(root.server_relative_path(), "");
    }

    #[test]
    fn test_site_address_keeps_port() {
        let site = SiteAddress::parse("http://127.0.0.1:8080/sites/dev").unwrap();
        assert_eq!(site.authority(), "127.0.0.1:8080");
        assert_eq!(site.as_str(), "http://127.0.0.1:8080/sites/dev");
    }

    #[test]
    fn test_site_address_rejects_bad_input() {
        assert!(matches!(SiteAddress::parse("not a url"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(
            SiteAddress::parse("ftp://contoso.sharepoint.com/sites/x"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_server_relative_path_join() {
        let path = ServerRelativePath::new()
            .join("/sites/teamsite")
            .join("Shared Documents")
            .join("/2024//Q1/");
        assert_eq!(path.to_string(), "/sites/teamsite/Shared Documents/2024/Q1");
        assert_eq!(path.segments().len(), 5);
        assert_eq!(ServerRelativePath::new().to_string(), "/");
    }

    #[test]
    fn test_quote_odata() {
        assert_eq!(quote_odata("Documents"), "Documents");
        assert_eq!(quote_odata("Bob's List"), "Bob''s%20List");
        assert_eq!(quote_odata("/sites/a/R&D #1.xlsx"), "/sites/a/R%26D%20%231.xlsx");
    }

    #[test]
    fn test_encode_segments() {
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_segments("/Reports/2024 Q1//"), "Reports/2024%20Q1");
    }
}
