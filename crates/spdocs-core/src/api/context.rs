//! Resource context: queue reads with [`ClientContext::load`], run them with
//! [`ClientContext::execute_query`], collect each result with
//! [`ClientContext::take`].
//!
//! One pending load is sent as a plain GET. Several are sent as a single
//! `$batch` POST whose response parts are matched to handles by position.

use std::collections::HashMap;

use reqwest::header;
use serde_json::Value;
use tracing::{debug, warn};

use super::batch::{decode_response, BatchRequest};
use super::ApiError;
use crate::auth::Session;
use crate::utils::SiteAddress;

/// Entities come back without OData metadata wrappers.
pub const NOMETADATA_JSON: &str = "application/json;odata=nometadata";

/// Identifies one queued load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadHandle(usize);

pub struct ClientContext {
    session: Session,
    site: SiteAddress,
    pending: Vec<(LoadHandle, String)>,
    results: HashMap<LoadHandle, Result<Value, ApiError>>,
    next_handle: usize,
}

impl ClientContext {
    pub fn new(session: Session, site: SiteAddress) -> Self {
        Self {
            session,
            site,
            pending: Vec::new(),
            results: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn site(&self) -> &SiteAddress {
        &self.site
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Number of loads waiting for `execute_query`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue a GET of `{site}/_api/{relative}`.
    pub fn load(&mut self, relative: &str) -> LoadHandle {
        let handle = LoadHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push((handle, self.site.api_url(relative)));
        handle
    }

    /// Send every pending load in one round trip.
    ///
    /// Fails as a whole only when the round trip itself fails: token
    /// acquisition, transport, or a 401 on the request carrying the loads
    /// (the batch POST, or the plain GET of a single load). Other status
    /// errors of individual loads are delivered through [`Self::take`].
    pub async fn execute_query(&mut self) -> Result<(), ApiError> {
        let pending = std::mem::take(&mut self.pending);
        match pending.len() {
            0 => Ok(()),
            1 => {
                let (handle, url) = &pending[0];
                match self.session.get_json(url, NOMETADATA_JSON).await {
                    Err(e @ (ApiError::NetworkError(_) | ApiError::Auth(_) | ApiError::Unauthorized)) => Err(e),
                    result => {
                        self.results.insert(*handle, result);
                        Ok(())
                    }
                }
            }
            _ => self.execute_batch(pending).await,
        }
    }

    async fn execute_batch(&mut self, pending: Vec<(LoadHandle, String)>) -> Result<(), ApiError> {
        let urls: Vec<String> = pending.iter().map(|(_, url)| url.clone()).collect();
        let request = BatchRequest::encode(&urls, NOMETADATA_JSON);
        let batch_url = self.site.api_url("$batch");

        debug!(loads = pending.len(), "Executing batch");
        let response = self
            .session
            .post(&batch_url, &request.content_type(), "multipart/mixed", request.body)
            .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;
        let parts = decode_response(content_type.as_deref(), &text)?;

        if parts.len() != pending.len() {
            warn!(expected = pending.len(), received = parts.len(), "Batch response part count mismatch");
            return Err(ApiError::InvalidResponse(format!(
                "Batch returned {} parts for {} requests",
                parts.len(),
                pending.len()
            )));
        }

        for ((handle, url), part) in pending.into_iter().zip(parts) {
            let result = part.into_result();
            if let Err(ref e) = result {
                warn!(url = %url, error = %e, "Batched request failed");
                if e.is_auth_failure() {
                    self.session.clear();
                }
            }
            self.results.insert(handle, result);
        }
        Ok(())
    }

    /// Remove and return the result of an executed load.
    pub fn take(&mut self, handle: LoadHandle) -> Result<Value, ApiError> {
        self.results.remove(&handle).unwrap_or_else(|| {
            Err(ApiError::InvalidResponse(
                "No result for load; was execute_query called?".to_string(),
            ))
        })
    }

    /// Queue one load, execute it and return its result.
    pub async fn fetch(&mut self, relative: &str) -> Result<Value, ApiError> {
        let handle = self.load(relative);
        self.execute_query().await?;
        self.take(handle)
    }
}
