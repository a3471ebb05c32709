//! pagetally server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tally_client::{FetchClient, FetchConfig};
use tally_core::{AppConfig, FetchOrchestrator, store};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        backend = ?config.store_backend,
        ttl_secs = config.cache_ttl_secs,
        "Starting pagetally server on stdio transport"
    );

    let store = store::open_configured(&config).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let orchestrator = FetchOrchestrator::new(store.clone(), Arc::new(fetcher));

    let handler = handler::PageTallyServer::new(orchestrator, store, config.cache_ttl_secs);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
