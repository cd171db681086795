//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event to the worker. Passed-through requests are
//! fetched from the network directly, the way a browser would without a worker.

use harbor_client::{
    FetchOutcome, OfflineWorker, PassReason, Request, RequestMode, Strategy, WorkerEvents, fetch::resolve,
};
use harbor_core::{Error, Response};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL or a path on the worker's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: RequestMode,

    /// Extra request headers, sent on to the network.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// Strategy the worker applied, absent on passthrough.
    pub strategy: Option<Strategy>,
    /// Why the worker left the request alone, absent when it responded.
    pub passthrough: Option<PassReason>,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

impl SwFetchOutput {
    fn new(url: String, strategy: Option<Strategy>, passthrough: Option<PassReason>, response: Response) -> Self {
        Self {
            url,
            strategy,
            passthrough,
            status: response.status,
            body: response.text(),
            status_text: response.status_text,
            headers: response.headers,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = params
        .headers
        .into_iter()
        .fold(Request::new(params.method, url, params.mode), |request, (name, value)| {
            request.with_header(name, value)
        });
    let url = request.url.to_string();

    let output = match worker.on_fetch(request.clone()).await {
        FetchOutcome::Respond { strategy, response } => SwFetchOutput::new(url, Some(strategy), None, response),
        FetchOutcome::Passthrough(reason) => {
            let response = worker.network().fetch(&request).await?;
            SwFetchOutput::new(url, None, Some(reason), response)
        }
    };

    json_result(&output)
}
