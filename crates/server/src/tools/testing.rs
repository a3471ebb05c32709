//! Shared fixtures for tool tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use tally_core::{FetchError, FetchOrchestrator, Fetcher, KvStore, MemoryStore};
use tokio::sync::Mutex;

/// Serves one fixed body, or a fixed failure, and records requested URLs.
pub struct StubFetcher {
    body: Result<&'static str, FetchError>,
    pub calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn ok(body: &'static str) -> Arc<Self> {
        Arc::new(Self { body: Ok(body), calls: Mutex::default() })
    }

    pub fn failing(err: FetchError) -> Arc<Self> {
        Arc::new(Self { body: Err(err), calls: Mutex::default() })
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.lock().await.push(url.to_string());
        self.body.clone().map(|b| Bytes::from_static(b.as_bytes()))
    }
}

pub fn orchestrator(fetcher: Arc<StubFetcher>) -> (FetchOrchestrator, Arc<dyn KvStore>) {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    (FetchOrchestrator::new(store.clone(), fetcher), store)
}

/// Decode the JSON text content of a tool result.
pub fn decode<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
