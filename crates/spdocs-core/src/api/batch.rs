//! SharePoint `$batch` request encoding and response decoding.
//!
//! A batch is one `multipart/mixed` POST to `{site}/_api/$batch` with one
//! `application/http` part per GET. The response carries one part per request,
//! in request order.

use reqwest::StatusCode;
use serde_json::Value;

use super::ApiError;

/// Encoded batch body plus the content type announcing its boundary.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub boundary: String,
    pub body: String,
}

impl BatchRequest {
    /// Encode absolute GET URLs as one multipart body.
    pub fn encode(urls: &[String], accept: &str) -> Self {
        let boundary = format!("batch_{}", uuid::Uuid::new_v4());
        let mut out = String::new();
        for url in urls {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str("Content-Type: application/http\r\n");
            out.push_str("Content-Transfer-Encoding: binary\r\n\r\n");
            out.push_str(&format!("GET {} HTTP/1.1\r\n", url));
            out.push_str(&format!("Accept: {}\r\n\r\n", accept));
        }
        out.push_str(&format!("--{}--\r\n", boundary));
        Self { boundary, body: out }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// One decoded response part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPart {
    pub status: u16,
    pub body: String,
}

impl BatchPart {
    /// JSON payload of a success part, or the typed error for its status.
    pub fn into_result(self) -> Result<Value, ApiError> {
        let status = StatusCode::from_u16(self.status).map_err(|_| {
            ApiError::InvalidResponse(format!("Invalid status in batch part: {}", self.status))
        })?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &self.body));
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse batch part JSON: {}", e))
        })
    }
}

/// Extract `boundary=` from a `Content-Type` header value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|b| !b.is_empty())
    })
}

/// Split a text block at the first blank line into (head, rest).
fn split_head(block: &str) -> (&str, &str) {
    match block.find("\n\n") {
        Some(idx) => (&block[..idx], &block[idx + 2..]),
        None => (block, ""),
    }
}

/// Decode a `multipart/mixed` batch response. Without a boundary from the
/// headers, the first delimiter line of the body is used.
pub fn decode_response(content_type: Option<&str>, body: &str) -> Result<Vec<BatchPart>, ApiError> {
    let body = body.replace("\r\n", "\n");

    let boundary = content_type
        .and_then(boundary_from_content_type)
        .or_else(|| {
            body.lines()
                .find(|l| l.starts_with("--"))
                .map(|l| l.trim_start_matches("--").trim().to_string())
        })
        .ok_or_else(|| ApiError::InvalidResponse("Batch response has no boundary".to_string()))?;

    let delimiter = format!("--{}", boundary);
    let mut parts = Vec::new();

    for chunk in body.split(delimiter.as_str()).skip(1) {
        if chunk.starts_with("--") {
            break;
        }
        let chunk = chunk.trim_start_matches('\n');
        // MIME headers of the part, then the embedded HTTP response
        let (_, http) = split_head(chunk);
        let (head, payload) = split_head(http);

        let status_line = head.lines().next().unwrap_or_default();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                ApiError::InvalidResponse(format!("Malformed batch status line: {}", status_line))
            })?;

        parts.push(BatchPart {
            status,
            body: payload.trim().to_string(),
        });
    }

    Ok(parts)
}
