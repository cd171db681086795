//! sw_install, sw_activate and sw_status tool implementations.

use harbor_client::{OfflineWorker, WorkerEvents, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    pub state: WorkerState,
    /// Number of precached resources.
    pub precached: usize,
    /// Whether activation followed immediately (skip_waiting).
    pub activated: bool,
    pub deleted_caches: Vec<String>,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: WorkerState,
    pub deleted_caches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub current: bool,
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub state: WorkerState,
    pub cache_name: String,
    pub origin: String,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let precached = worker.on_install().await?;

    let (activated, deleted_caches) =
        if worker.skip_waiting() { (true, worker.on_activate().await?) } else { (false, Vec::new()) };

    let output = InstallOutput { state: worker.state().await, precached, activated, deleted_caches };
    json_result(&output)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let deleted_caches = worker.on_activate().await?;
    let output = ActivateOutput { state: worker.state().await, deleted_caches };
    json_result(&output)
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let cache = worker.cache();
    let current = &worker.config().cache_name;

    let mut stores = Vec::new();
    for name in cache.store_names().await? {
        let entries = cache.entry_count(&name).await?;
        stores.push(StoreSummary { current: &name == current, name, entries });
    }

    let output = StatusOutput {
        state: worker.state().await,
        cache_name: current.clone(),
        origin: worker.config().origin.to_string(),
        skip_waiting: worker.skip_waiting(),
        clients_claimed: worker.clients_claimed(),
        stores,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, worker};
    use harbor_core::Response;

    #[tokio::test]
    async fn test_install_with_skip_waiting_activates() {
        let (_network, worker) = worker().await;
        worker.cache().open_store("maison-dorient-v0").await.unwrap();

        let result = install_impl(&worker).await.unwrap();
        let out: InstallOutput = output(&result);
        assert_eq!(out.precached, 3);
        assert!(out.activated);
        assert_eq!(out.state, WorkerState::Activated);
        assert_eq!(out.deleted_caches, vec!["maison-dorient-v0"]);
    }

    #[tokio::test]
    async fn test_install_failure_reports_error() {
        let (network, worker) = worker().await;
        network.route("/offline", Response::new(404, "missing"));

        let err = install_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
        assert_eq!(worker.state().await, WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_invalid_state() {
        let (_network, worker) = worker().await;
        let err = activate_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32009);
    }

    #[tokio::test]
    async fn test_status() {
        let (_network, worker) = worker().await;
        install_impl(&worker).await.unwrap();

        let out: StatusOutput = output(&status_impl(&worker).await.unwrap());
        assert_eq!(out.state, WorkerState::Activated);
        assert_eq!(out.cache_name, "maison-dorient-v1");
        assert!(out.clients_claimed);
        assert_eq!(out.stores.len(), 1);
        assert_eq!(out.stores[0].entries, 3);
        assert!(out.stores[0].current);
    }
}
