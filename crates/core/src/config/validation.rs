//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` or `user_agent` is empty
    /// - `origin` is not an http(s) URL
    /// - `offline_url`, a precache entry or a bypass prefix does not start with `/`
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if !self.offline_url.starts_with('/') {
            return Err(invalid("offline_url", "must be an absolute path"));
        }
        if let Some(path) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("{path} is not an absolute path")));
        }
        if let Some(prefix) = self.bypass_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("bypass_prefixes", format!("{prefix} is not an absolute path")));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(invalid("timeout_ms", "must be at least 100ms"));
            }
            if timeout_ms > 300_000 {
                return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.precache.contains(&self.offline_url) {
            tracing::warn!(
                offline_url = %self.offline_url,
                "offline_url is not precached; navigations will get a bare 503 when offline"
            );
        }

        Ok(())
    }
}
