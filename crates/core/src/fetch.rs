//! Fetch collaborator port.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Retrieves the body of a remote resource.
///
/// Implementations own any retry or timeout policy; the orchestrator calls
/// [`fetch`](Self::fetch) at most once per cache miss.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}
