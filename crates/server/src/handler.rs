//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CachePurgeParams, PageCountParams, PageGetParams, cache::purge_impl, page_count::count_impl, page_get::get_impl,
};

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
use tally_core::{FetchOrchestrator, KvStore};

/// The main MCP server handler for pagetally.
#[derive(Clone)]
pub struct PageTallyServer {
    tool_router: ToolRouter<Self>,
    orchestrator: FetchOrchestrator,
    store: Arc<dyn KvStore>,
    default_ttl_secs: i64,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PageTallyServer {
    /// Create a new server handler.
    ///
    /// `orchestrator` and `store` must share the same backing store.
    pub fn new(orchestrator: FetchOrchestrator, store: Arc<dyn KvStore>, default_ttl_secs: i64) -> Self {
        Self { tool_router: Self::tool_router(), orchestrator, store, default_ttl_secs }
    }

    /// Fetch a page through the cache and count the access.
    #[tool(
        description = "Fetch a URL. Serves the cached body while it is fresh, otherwise fetches and caches it. \
                       Every call increments the URL's access count."
    )]
    async fn page_get(&self, params: Parameters<PageGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.orchestrator, self.default_ttl_secs, params.0).await
    }

    /// Read a URL's access count.
    #[tool(description = "Return how many times a URL has been requested through page_get.")]
    async fn page_count(&self, params: Parameters<PageCountParams>) -> Result<CallToolResult, McpError> {
        count_impl(self.orchestrator.counter(), params.0).await
    }

    /// Remove expired cache entries from the store.
    #[tool(description = "Delete expired cached page bodies from the store. Access counts are kept.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.store.as_ref(), params.0).await
    }
}

impl ServerHandler for PageTallyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pagetally".into(),
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
