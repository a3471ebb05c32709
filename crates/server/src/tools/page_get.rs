//! page_get tool implementation.
//!
//! Returns the body of a URL, from cache while it is fresh, and records the
//! access.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_client::canonicalize;
use tally_core::{Error, FetchOrchestrator, Lookup};

use super::json_result;

/// Input parameters for the page_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageGetParams {
    /// The URL to fetch.
    pub url: String,

    /// Seconds to keep the fetched body cached. Defaults to the server setting.
    #[serde(default)]
    pub ttl_secs: Option<i64>,
}

/// Output from the page_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageGetOutput {
    /// Canonical URL the content and count are keyed by.
    pub url: String,
    /// Page body.
    pub content: String,
    /// Accesses recorded for this URL, including this one.
    pub count: u64,
    /// "hit" when served from cache, "miss" when fetched.
    pub cache: String,
}

/// Implementation of the page_get tool.
pub async fn get_impl(
    orchestrator: &FetchOrchestrator, default_ttl_secs: i64, params: PageGetParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = canonicalize(&params.url).map_err(Error::from)?;
    let ttl_secs = params.ttl_secs.unwrap_or(default_ttl_secs);

    let tracked = orchestrator
        .fetch_and_track_detailed(url.as_str(), ttl_secs)
        .await?;

    let output = PageGetOutput {
        url: url.to_string(),
        content: tracked.content,
        count: tracked.count,
        cache: match tracked.lookup {
            Lookup::Hit => "hit".into(),
            Lookup::Miss => "miss".into(),
        },
    };

    Ok(json_result(&output)?)
}
