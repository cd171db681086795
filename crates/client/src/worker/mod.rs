//! Worker lifecycle and event dispatch.
//!
//! A host drives the worker through [`WorkerEvents`]:
//!
//! ```text
//! Parsed --install--> Installing --ok--> Installed (waiting) --activate--> Activating --> Activated
//!                          \--err--> Redundant --install--> Installing ...
//! ```
//!
//! Only an activated worker intercepts fetches. Activation sweeps every cache
//! store whose name differs from the current one; there is no per-entry expiry.

pub mod push;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use harbor_core::cache::storage::PendingEntry;
use harbor_core::{AppConfig, CacheDb, Error, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{Network, Request, is_same_origin, resolve};
use crate::strategy::{CacheExecutor, Strategy, StrategyRules};

pub use push::{ClickOutcome, Notification, NotificationAction, PushPayload};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting for the host to activate it.
    Installed,
    Activating,
    Activated,
    /// Install failed; a new install attempt may follow.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Why a fetch was left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    NotActivated,
    NonGet,
    CrossOrigin,
    Bypassed,
}

/// Result of dispatching a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker does not handle this request; the host fetches it untouched.
    Passthrough(PassReason),
    Respond { strategy: Strategy, response: Response },
}

/// Resolved worker settings. Built once; the worker never mutates it.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cache_name: String,
    pub origin: Url,
    pub offline_url: Url,
    pub precache: Vec<Url>,
    pub bypass_prefixes: Vec<String>,
    pub skip_waiting: bool,
    pub notification_icon: String,
    pub notification_badge: String,
}

impl WorkerConfig {
    /// Resolve every configured path against the origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let resolve_path = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let offline_url = resolve_path(&config.offline_url)?;
        let precache = config
            .precache
            .iter()
            .map(|p| resolve_path(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cache_name: config.cache_name.clone(),
            offline_url,
            precache,
            bypass_prefixes: config.bypass_prefixes.clone(),
            skip_waiting: config.skip_waiting,
            notification_icon: config.notification_icon.clone(),
            notification_badge: config.notification_badge.clone(),
            origin,
        })
    }
}

/// Events a host dispatches to a worker.
#[async_trait]
pub trait WorkerEvents: Send + Sync {
    /// Precache the install list. Returns the number of stored entries.
    async fn on_install(&self) -> Result<usize, Error>;

    /// Sweep stale stores and take control. Returns the deleted store names.
    async fn on_activate(&self) -> Result<Vec<String>, Error>;

    async fn on_fetch(&self, request: Request) -> FetchOutcome;

    /// Build the notification for a push message, or `None` to drop it.
    fn on_push(&self, data: Option<&[u8]>) -> Option<Notification>;

    fn on_notification_click(&self, action: Option<&str>, notification: &Notification) -> ClickOutcome;
}

/// The offline caching worker.
pub struct OfflineWorker {
    config: WorkerConfig,
    rules: StrategyRules,
    executor: CacheExecutor,
    cache: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    clients_claimed: AtomicBool,
}

impl OfflineWorker {
    pub fn new(config: WorkerConfig, rules: StrategyRules, cache: CacheDb, network: Arc<dyn Network>) -> Self {
        let executor =
            CacheExecutor::new(cache.clone(), Arc::clone(&network), &config.cache_name, config.offline_url.as_str());
        Self {
            config,
            rules,
            executor,
            cache,
            network,
            state: RwLock::new(WorkerState::Parsed),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn from_app_config(config: &AppConfig, cache: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let worker_config = WorkerConfig::from_app_config(config)?;
        let rules = StrategyRules::from_config(config)?;
        Ok(Self::new(worker_config, rules, cache, network))
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Whether the host may activate as soon as install completes.
    pub fn skip_waiting(&self) -> bool {
        self.config.skip_waiting
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn classify(&self, pathname: &str) -> Strategy {
        self.rules.classify(pathname)
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot move from {} to {}", *state, to)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    async fn precache(&self) -> Result<usize, Error> {
        let name = &self.config.cache_name;
        self.cache.open_store(name).await?;

        let mut entries = Vec::with_capacity(self.config.precache.len());
        for url in &self.config.precache {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed(format!("{url}: {e}")))?;
            if !response.is_ok() {
                return Err(Error::PrecacheFailed(format!("{url} returned {}", response.status)));
            }
            entries.push(PendingEntry { method: request.method, url: url.to_string(), response });
        }

        let count = entries.len();
        self.cache
            .put_all(name, entries)
            .await
            .map_err(|e| Error::PrecacheFailed(e.to_string()))?;
        Ok(count)
    }

    fn pass_reason(&self, request: &Request) -> Option<PassReason> {
        if !request.is_get() {
            Some(PassReason::NonGet)
        } else if !is_same_origin(&request.url, &self.config.origin) {
            Some(PassReason::CrossOrigin)
        } else if self
            .config
            .bypass_prefixes
            .iter()
            .any(|prefix| request.url.path().starts_with(prefix.as_str()))
        {
            Some(PassReason::Bypassed)
        } else {
            None
        }
    }
}

#[async_trait]
impl WorkerEvents for OfflineWorker {
    async fn on_install(&self) -> Result<usize, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;

        tracing::info!("precaching {} resources into {}", self.config.precache.len(), self.config.cache_name);

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "install failed; worker is redundant");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<Vec<String>, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)
            .await?;

        let sweep = async {
            let mut deleted = Vec::new();
            for name in self.cache.store_names().await? {
                if name != self.config.cache_name {
                    tracing::info!("deleting old cache: {}", name);
                    self.cache.delete_store(&name).await?;
                    deleted.push(name);
                }
            }
            Ok::<_, Error>(deleted)
        };

        match sweep.await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated).await;
                self.clients_claimed.store(true, Ordering::SeqCst);
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    async fn on_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().await.can_intercept_fetch() {
            return FetchOutcome::Passthrough(PassReason::NotActivated);
        }
        if let Some(reason) = self.pass_reason(&request) {
            tracing::trace!("passing through {} {} ({:?})", request.method, request.url, reason);
            return FetchOutcome::Passthrough(reason);
        }

        let strategy = self.classify(request.url.path());
        tracing::debug!("{} {} -> {}", request.method, request.url, strategy);
        let response = self.executor.execute(strategy, &request).await;
        FetchOutcome::Respond { strategy, response }
    }

    fn on_push(&self, data: Option<&[u8]>) -> Option<Notification> {
        let payload = PushPayload::parse(data)?;
        Some(Notification::from_payload(payload, &self.config.notification_icon, &self.config.notification_badge))
    }

    fn on_notification_click(&self, action: Option<&str>, notification: &Notification) -> ClickOutcome {
        push::click_outcome(&self.config.origin, action, notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, ORIGIN, url};

    fn app_config() -> AppConfig {
        AppConfig { origin: ORIGIN.into(), ..Default::default() }
    }

    async fn setup_with(config: AppConfig) -> (CacheDb, Arc<FakeNetwork>, OfflineWorker) {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(FakeNetwork::new());
        network.route("/", Response::new(200, "home"));
        network.route("/offline", Response::new(200, "<h1>You are offline</h1>"));
        network.route("/manifest.json", Response::new(200, "{}"));
        let worker = OfflineWorker::from_app_config(&config, cache.clone(), network.clone()).unwrap();
        (cache, network, worker)
    }

    async fn setup() -> (CacheDb, Arc<FakeNetwork>, OfflineWorker) {
        setup_with(app_config()).await
    }

    async fn activated() -> (CacheDb, Arc<FakeNetwork>, OfflineWorker) {
        let (cache, network, worker) = setup().await;
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        (cache, network, worker)
    }

    #[test]
    fn test_worker_config_resolves_paths() {
        let config = WorkerConfig::from_app_config(&app_config()).unwrap();
        assert_eq!(config.offline_url.as_str(), "https://maison.example/offline");
        let precache: Vec<_> = config.precache.iter().map(Url::as_str).collect();
        assert_eq!(
            precache,
            vec!["https://maison.example/", "https://maison.example/offline", "https://maison.example/manifest.json"]
        );
    }

    #[tokio::test]
    async fn test_install_precaches() {
        let (cache, _network, worker) = setup().await;
        assert_eq!(worker.state().await, WorkerState::Parsed);

        let count = worker.on_install().await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert_eq!(cache.entry_count("maison-dorient-v1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_failure_is_all_or_nothing() {
        let (cache, network, worker) = setup().await;
        network.route("/manifest.json", Response::new(500, "boom"));

        let err = worker.on_install().await.unwrap_err();
        assert!(matches!(err, Error::PrecacheFailed(_)));
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert_eq!(cache.entry_count("maison-dorient-v1").await.unwrap(), 0);

        network.route("/manifest.json", Response::new(200, "{}"));
        assert_eq!(worker.on_install().await.unwrap(), 3);
        assert_eq!(worker.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let (_cache, network, worker) = setup().await;
        network.set_online(false);
        assert!(matches!(worker.on_install().await, Err(Error::PrecacheFailed(_))));
    }

    #[tokio::test]
    async fn test_lifecycle_order_enforced() {
        let (_cache, _network, worker) = setup().await;
        assert!(matches!(worker.on_activate().await, Err(Error::InvalidState(_))));

        worker.on_install().await.unwrap();
        assert!(matches!(worker.on_install().await, Err(Error::InvalidState(_))));

        worker.on_activate().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(worker.clients_claimed());
        assert!(matches!(worker.on_activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_only_old_versions() {
        let config = AppConfig { cache_name: "v2-current".into(), ..app_config() };
        let (cache, _network, worker) = setup_with(config).await;
        cache.open_store("v1").await.unwrap();
        cache.open_store("v2-current").await.unwrap();

        worker.on_install().await.unwrap();
        let deleted = worker.on_activate().await.unwrap();
        assert_eq!(deleted, vec!["v1"]);
        assert_eq!(cache.store_names().await.unwrap(), vec!["v2-current"]);
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let (_cache, _network, worker) = setup().await;
        let outcome = worker.on_fetch(Request::get(url("/"))).await;
        assert_eq!(outcome, FetchOutcome::Passthrough(PassReason::NotActivated));
    }

    #[tokio::test]
    async fn test_fetch_passthrough_rules() {
        let (_cache, network, worker) = activated().await;
        let calls = network.calls();

        let post = Request::new("POST", url("/api/leads"), Default::default());
        assert_eq!(worker.on_fetch(post).await, FetchOutcome::Passthrough(PassReason::NonGet));

        let external = Request::get(Url::parse("https://cdn.example/logo.png").unwrap());
        assert_eq!(worker.on_fetch(external).await, FetchOutcome::Passthrough(PassReason::CrossOrigin));

        let admin = Request::get(url("/admin/listings"));
        assert_eq!(worker.on_fetch(admin).await, FetchOutcome::Passthrough(PassReason::Bypassed));

        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_icon_fetched_once_then_served_from_cache() {
        let (cache, network, worker) = activated().await;
        network.route("/icons/logo.png", Response::new(200, "png").with_header("content-type", "image/png"));
        let before = network.calls();

        let FetchOutcome::Respond { strategy, response } = worker.on_fetch(Request::get(url("/icons/logo.png"))).await
        else {
            panic!("expected a response");
        };
        assert_eq!(strategy, Strategy::CacheFirst);
        assert_eq!(response.status, 200);
        assert_eq!(network.calls(), before + 1);
        assert!(cache.match_any("GET", url("/icons/logo.png").as_str()).await.unwrap().is_some());

        let FetchOutcome::Respond { strategy, response } = worker.on_fetch(Request::get(url("/icons/logo.png"))).await
        else {
            panic!("expected a response");
        };
        assert_eq!(strategy, Strategy::CacheFirst);
        assert_eq!(response.text(), "png");
        assert_eq!(network.calls(), before + 1);
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_precached_offline_page() {
        let (_cache, network, worker) = activated().await;
        network.set_online(false);

        let outcome = worker.on_fetch(Request::navigate(url("/properties?x=1"))).await;
        let FetchOutcome::Respond { strategy, response } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(strategy, Strategy::NetworkFirst);
        assert_eq!(response.text(), "<h1>You are offline</h1>");
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let (_cache, _network, worker) = setup().await;
        let notification = worker
            .on_push(Some(br#"{"title":"Price drop","body":"Villa Azur","url":"/properties/villa-azur"}"#))
            .unwrap();
        assert_eq!(notification.title, "Price drop");
        assert_eq!(notification.tag, "default");
        assert_eq!(notification.icon, "/icons/icon-192x192.png");

        assert_eq!(
            worker.on_notification_click(Some("view"), &notification),
            ClickOutcome::OpenWindow { url: "https://maison.example/properties/villa-azur".into() }
        );
        assert_eq!(worker.on_notification_click(Some("close"), &notification), ClickOutcome::Dismiss);

        assert!(worker.on_push(None).is_none());
        assert!(worker.on_push(Some(b"{oops")).is_none());
    }
}
