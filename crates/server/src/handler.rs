//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and the client hook.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::{SyncDrainParams, SyncSubmitParams, WorkerFetchParams, fetch, status, sync};

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
use souk_client::{ClientHook, Worker};

/// The main MCP server handler for the souk worker.
#[derive(Clone)]
pub struct WorkerServer {
    worker: Arc<Worker>,
    hook: ClientHook,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler.
    pub fn new(worker: Arc<Worker>, hook: ClientHook) -> Self {
        Self { worker, hook, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the offline worker. Intercepted GETs are served cache-first or network-first; anything else goes straight to the network."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Submit a write for a record kind. Delivered immediately when the backend accepts it, queued for background sync when it is unreachable or answers 5xx, 408 or 429, rejected on other client errors."
    )]
    async fn sync_submit(&self, params: Parameters<SyncSubmitParams>) -> Result<CallToolResult, McpError> {
        sync::submit_impl(&self.worker, params.0).await
    }

    /// Replay queued writes.
    #[tool(description = "Replay queued writes for one record kind, or all kinds. Delivered records are removed.")]
    async fn sync_drain(&self, params: Parameters<SyncDrainParams>) -> Result<CallToolResult, McpError> {
        sync::drain_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report app state, cache partitions, pending sync queues and storage usage.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status::status_impl(&self.worker, &self.hook).await
    }

    #[tool(description = "Apply a waiting update: reload onto the current version and prune stale partitions.")]
    async fn app_update(&self) -> Result<CallToolResult, McpError> {
        status::update_impl(&self.worker, &self.hook).await
    }

    #[tool(description = "Look up the cached response for a URL, optionally within one partition.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a named cache partition, or prune every stale partition when no name is given.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "souk-worker".into(),
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
