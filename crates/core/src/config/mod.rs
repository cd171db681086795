//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HARBOR_*)
//! 2. TOML config file (if HARBOR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HARBOR_*)
/// 2. TOML config file (if HARBOR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Versioned name of the current cache store. Bumping it on deploy is
    /// the only way to invalidate previously cached entries.
    ///
    /// Set via HARBOR_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin the worker controls; requests to other origins pass through.
    ///
    /// Set via HARBOR_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the offline fallback page served to navigations.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Paths fetched and stored at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path prefixes that are never intercepted.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    /// Path patterns served cache-first. Checked before `network_first`.
    #[serde(default = "default_cache_first")]
    pub cache_first: Vec<String>,

    /// Path patterns served network-first.
    #[serde(default = "default_network_first")]
    pub network_first: Vec<String>,

    /// Whether an installed worker may activate without waiting.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,

    /// Path to SQLite cache database.
    ///
    /// Set via HARBOR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional HTTP request timeout in milliseconds. Unset means fetches run
    /// for as long as the transport allows.
    ///
    /// Set via HARBOR_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_cache_name() -> String {
    "maison-dorient-v1".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_offline_url() -> String {
    "/offline".into()
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/offline".into(), "/manifest.json".into()]
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/admin".into()]
}

fn default_cache_first() -> Vec<String> {
    vec![r"\.(?:png|jpg|jpeg|gif|webp|svg|ico)$".into(), r"\.(?:woff|woff2|ttf|otf)$".into(), r"/icons/".into()]
}

fn default_network_first() -> Vec<String> {
    vec![r"/api/".into(), r"/properties".into(), r"/neighborhoods".into()]
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/badge-72x72.png".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./harbor-cache.sqlite")
}

fn default_user_agent() -> String {
    "harbor-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            offline_url: default_offline_url(),
            precache: default_precache(),
            bypass_prefixes: default_bypass_prefixes(),
            cache_first: default_cache_first(),
            network_first: default_network_first(),
            skip_waiting: true,
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HARBOR_`
    /// 2. TOML file from `HARBOR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HARBOR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HARBOR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
