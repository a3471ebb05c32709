//! cache_purge tool implementation.
//!
//! Physically removes expired cache entries. Expired entries are already
//! invisible to reads; this only reclaims their space. Counts never expire
//! and are never removed.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_core::KvStore;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(store: &dyn KvStore, _params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = store.purge_expired().await?;
    tracing::info!(deleted, "purged expired cache entries");
    Ok(json_result(&CachePurgeOutput { deleted })?)
}
