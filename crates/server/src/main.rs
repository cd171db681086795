//! harbor-sw server entry point.
//!
//! Boots the offline worker and exposes its lifecycle, fetch and push events
//! as MCP tools on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use harbor_client::{FetchConfig, HttpNetwork, OfflineWorker};
use harbor_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
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
        cache_name = %config.cache_name,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting harbor-sw on stdio transport"
    );

    let cache = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let worker = OfflineWorker::from_app_config(&config, cache, Arc::new(network))?;

    let handler = handler::HarborServer::new(Arc::new(worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
