//! MCP server handler implementation.
//!
//! Each tool dispatches one worker event (or a cache inspection) and returns
//! the outcome as pretty-printed JSON text.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl},
    fetch::{SwFetchParams, fetch_impl},
    lifecycle::{activate_impl, install_impl, status_impl},
    push::{SwNotificationClickParams, SwPushParams, notification_click_impl, push_impl},
};
use harbor_client::OfflineWorker;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP host harness for the offline worker.
#[derive(Clone)]
pub struct HarborServer {
    worker: Arc<OfflineWorker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl HarborServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Dispatch the install event: precache resources, then activate if skip_waiting is set.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Dispatch the activate event: delete caches from older versions and take control of fetches.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report the worker lifecycle state and the cache stores it can see.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Dispatch a fetch event through the worker.
    ///
    /// Requests the worker passes through are fetched from the network without caching.
    #[tool(description = "Fetch a URL or path through the offline worker. Reports the strategy used and the response.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Returns the notification to display, or shown=false if dropped.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a notification. The 'view' action opens its URL; anything else dismisses it.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Look up the cached response for a URL or path across all cache stores.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a named cache store and/or trim the current store to its newest entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for HarborServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "harbor-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
