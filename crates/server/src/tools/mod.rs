//! MCP tool implementations.
//!
//! This module contains all tools exposed by the pagetally server.

pub mod cache;
pub mod page_count;
pub mod page_get;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::CachePurgeParams;
pub use page_count::PageCountParams;
pub use page_get::PageGetParams;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use tally_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, Error> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
