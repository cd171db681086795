//! The three fetch/cache policies.
//!
//! Every policy resolves to a [`Response`]. Network failures fall back to the
//! cache or to a synthetic `503 Offline`; cache read failures count as misses
//! and cache write failures are logged and otherwise ignored.

use std::sync::Arc;

use harbor_core::{CacheDb, Response};

use super::Strategy;
use crate::fetch::{Network, Request};

/// Cache handle bound to the current store name, cheap to move into tasks.
#[derive(Clone)]
struct CacheWriter {
    cache: CacheDb,
    cache_name: Arc<str>,
}

impl CacheWriter {
    async fn store(&self, request: &Request, response: &Response) {
        if let Err(e) = self
            .cache
            .put(&self.cache_name, &request.method, request.url.as_str(), response)
            .await
        {
            tracing::warn!(url = %request.url, error = %e, "cache write failed");
        }
    }

    /// Write without making the caller wait. The task is never joined, so a
    /// request that follows immediately may or may not observe the entry.
    fn store_detached(&self, request: Request, response: Response) {
        let writer = self.clone();
        drop(tokio::spawn(async move { writer.store(&request, &response).await }));
    }
}

/// Runs a [`Strategy`] against the cache and the network.
#[derive(Clone)]
pub struct CacheExecutor {
    writer: CacheWriter,
    network: Arc<dyn Network>,
    offline_url: String,
}

impl CacheExecutor {
    /// `offline_url` must be absolute; it is looked up as a GET when a
    /// navigation cannot be answered.
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, cache_name: &str, offline_url: impl Into<String>) -> Self {
        Self {
            writer: CacheWriter { cache, cache_name: Arc::from(cache_name) },
            network,
            offline_url: offline_url.into(),
        }
    }

    pub async fn execute(&self, strategy: Strategy, request: &Request) -> Response {
        match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn lookup(&self, method: &str, url: &str) -> Option<Response> {
        match self.writer.cache.match_any(method, url).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Serve from cache; on a miss fetch, store a 2xx and return it.
    pub async fn cache_first(&self, request: &Request) -> Response {
        if let Some(cached) = self.lookup(&request.method, request.url.as_str()).await {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.writer.store(request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::info!("network request failed: {} ({})", request.url, e);
                Response::offline()
            }
        }
    }

    /// Fetch and store a 2xx; when offline fall back to the cached entry, then
    /// to the offline page for navigations, then to `503 Offline`.
    pub async fn network_first(&self, request: &Request) -> Response {
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.writer.store(request, &response).await;
                }
                return response;
            }
            Err(e) => e,
        };

        tracing::info!("network request failed: {} ({}), trying cache", request.url, err);

        if let Some(cached) = self.lookup(&request.method, request.url.as_str()).await {
            return cached;
        }

        if request.is_navigation()
            && let Some(page) = self.lookup("GET", &self.offline_url).await
        {
            return page;
        }

        Response::offline()
    }

    /// Return the cached entry at once and refresh it in the background; with
    /// nothing cached, wait for the network instead.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Response {
        if let Some(cached) = self.lookup(&request.method, request.url.as_str()).await {
            self.revalidate_detached(request.clone());
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.writer.store_detached(request.clone(), response.clone());
                }
                response
            }
            Err(e) => {
                tracing::info!("network request failed: {} ({})", request.url, e);
                Response::offline()
            }
        }
    }

    fn revalidate_detached(&self, request: Request) {
        let network = Arc::clone(&self.network);
        let writer = self.writer.clone();
        drop(tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_ok() => writer.store(&request, &response).await,
                Ok(response) => {
                    tracing::debug!("revalidation of {} got {}; keeping cached copy", request.url, response.status)
                }
                Err(e) => tracing::debug!("revalidation of {} failed: {}", request.url, e),
            }
        }));
    }
}
