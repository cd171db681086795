//! cache_get tool implementation.
//!
//! Retrieves the cached response for a request, searching every store.

use harbor_client::{OfflineWorker, fetch::resolve};
use harbor_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or a path on the worker's origin.
    pub url: String,

    /// HTTP method of the cached request (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = params.method.as_deref().unwrap_or("GET");

    let entry = worker
        .cache()
        .get_entry(method, url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{method} {url}")))?;

    let output = CacheGetOutput {
        store: entry.store,
        method: entry.method,
        url: entry.url,
        stored_at: entry.stored_at,
        status: entry.response.status,
        body_bytes: entry.response.body.len(),
        body: entry.response.text(),
        status_text: entry.response.status_text,
        headers: entry.response.headers,
    };
    json_result(&output)
}
