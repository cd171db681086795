//! cache_purge tool implementation.
//!
//! Deletes a named store, or trims the current store to its newest entries.

use harbor_client::OfflineWorker;
use harbor_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this store and every entry in it.
    pub cache_name: Option<String>,

    /// Keep only the newest N entries of the current store, by write time.
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Stores that were deleted.
    pub deleted_stores: Vec<String>,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &OfflineWorker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.cache_name.is_none() && params.max_entries.is_none() {
        return Err(
            Error::InvalidInput("At least one of cache_name or max_entries must be specified".to_string()).into(),
        );
    }

    let cache = worker.cache();
    let mut output = CachePurgeOutput { deleted_stores: Vec::new(), deleted: 0 };

    if let Some(name) = params.cache_name {
        let entries = cache.entry_count(&name).await?;
        if cache.delete_store(&name).await? {
            tracing::info!("purged cache {} ({} entries)", name, entries);
            output.deleted += entries;
            output.deleted_stores.push(name);
        }
    }

    if let Some(max_entries) = params.max_entries {
        output.deleted += cache
            .purge_oldest_entries(&worker.config().cache_name, max_entries)
            .await?;
    }

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ORIGIN, output, worker};
    use harbor_core::Response;

    #[tokio::test]
    async fn test_purge_named_store() {
        let (_network, worker) = worker().await;
        let cache = worker.cache();
        cache
            .put("maison-dorient-v0", "GET", &format!("{ORIGIN}/"), &Response::new(200, "old"))
            .await
            .unwrap();
        cache
            .put("maison-dorient-v1", "GET", &format!("{ORIGIN}/"), &Response::new(200, "new"))
            .await
            .unwrap();

        let params = CachePurgeParams { cache_name: Some("maison-dorient-v0".into()), max_entries: None };
        let out: CachePurgeOutput = output(&purge_impl(&worker, params).await.unwrap());
        assert_eq!(out.deleted_stores, vec!["maison-dorient-v0"]);
        assert_eq!(out.deleted, 1);
        assert_eq!(cache.store_names().await.unwrap(), vec!["maison-dorient-v1"]);
    }

    #[tokio::test]
    async fn test_purge_keeps_newest() {
        let (_network, worker) = worker().await;
        for path in ["/a.js", "/b.js", "/c.js"] {
            worker
                .cache()
                .put("maison-dorient-v1", "GET", &format!("{ORIGIN}{path}"), &Response::new(200, path))
                .await
                .unwrap();
        }

        let params = CachePurgeParams { cache_name: None, max_entries: Some(1) };
        let out: CachePurgeOutput = output(&purge_impl(&worker, params).await.unwrap());
        assert_eq!(out.deleted, 2);
        assert!(out.deleted_stores.is_empty());
    }

    #[tokio::test]
    async fn test_purge_unknown_store_deletes_nothing() {
        let (_network, worker) = worker().await;
        let params = CachePurgeParams { cache_name: Some("nope".into()), max_entries: None };
        let out: CachePurgeOutput = output(&purge_impl(&worker, params).await.unwrap());
        assert_eq!(out.deleted, 0);
        assert!(out.deleted_stores.is_empty());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (_network, worker) = worker().await;
        let params = CachePurgeParams { cache_name: None, max_entries: None };

        let result = purge_impl(&worker, params).await;
        assert!(result.is_err());
    }
}
