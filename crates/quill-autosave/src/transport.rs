//! Patch transports
//!
//! [`PatchTransport`] is the seam between the autosave engine and the
//! server. [`HttpTransport`] speaks the JSON RPC over `reqwest`.

use crate::error::SaveError;
use async_trait::async_trait;
use quill_protocol::{
    ApiResponse, ChapterId, FieldValue, PatchApplied, PatchRequest, PatchableField, PATCH_ROUTE,
};
use std::time::Duration;

/// Delivers patches and reads server-side field text
#[async_trait]
pub trait PatchTransport: Send + Sync {
    /// Submit one patch
    async fn submit(&self, request: &PatchRequest) -> Result<PatchApplied, SaveError>;

    /// Current server text of a field (used to rebase after a conflict)
    async fn fetch_field(
        &self,
        record_id: ChapterId,
        field: PatchableField,
    ) -> Result<String, SaveError>;
}

/// JSON-over-HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport for a server at `base_url` (e.g. `http://127.0.0.1:3000`)
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SaveError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Transport reusing an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Server base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PatchTransport for HttpTransport {
    async fn submit(&self, request: &PatchRequest) -> Result<PatchApplied, SaveError> {
        let response: ApiResponse<PatchApplied> = self
            .client
            .post(format!("{}{PATCH_ROUTE}", self.base_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.into_result()?)
    }

    async fn fetch_field(
        &self,
        record_id: ChapterId,
        field: PatchableField,
    ) -> Result<String, SaveError> {
        let response: ApiResponse<FieldValue> = self
            .client
            .get(format!(
                "{}/api/chapters/{record_id}/fields/{field}",
                self.base_url
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.into_result()?.value)
    }
}
