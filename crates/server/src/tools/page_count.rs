//! page_count tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_client::canonicalize;
use tally_core::{AccessCounter, Error};

use super::json_result;

/// Parameters for the page_count tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageCountParams {
    /// The URL whose access count to read.
    pub url: String,
}

/// Output from the page_count tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageCountOutput {
    pub url: String,
    pub count: u64,
}

/// Read the access count without touching it.
pub async fn count_impl(counter: &AccessCounter, params: PageCountParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(Error::from)?;
    let count = counter.count(url.as_str()).await?;
    Ok(json_result(&PageCountOutput { url: url.to_string(), count })?)
}
