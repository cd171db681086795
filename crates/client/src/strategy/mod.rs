//! Request path classification into caching strategies.
//!
//! Rules are compiled once and evaluated in a fixed order: cache-first
//! patterns, then network-first patterns, then the stale-while-revalidate
//! default. Classification is total and has no side effects.

pub mod executor;

use std::fmt;

use harbor_core::{AppConfig, Error};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use executor::CacheExecutor;

/// Caching policy applied to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Immutable assets: serve from cache, fetch only on miss.
    CacheFirst,
    /// Fresh data: try the network, fall back to cache when offline.
    NetworkFirst,
    /// Serve cached copy immediately, refresh it in the background.
    StaleWhileRevalidate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::CacheFirst => write!(f, "cache-first"),
            Strategy::NetworkFirst => write!(f, "network-first"),
            Strategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}

/// Ordered pattern tables for [`StrategyRules::classify`].
#[derive(Debug, Clone)]
pub struct StrategyRules {
    cache_first: Vec<Regex>,
    network_first: Vec<Regex>,
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, Error> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("invalid strategy pattern {p:?}: {e}"))))
        .collect()
}

impl StrategyRules {
    /// Compile both pattern tables.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` naming the first pattern that fails to compile.
    pub fn new(cache_first: &[String], network_first: &[String]) -> Result<Self, Error> {
        Ok(Self { cache_first: compile(cache_first)?, network_first: compile(network_first)? })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.cache_first, &config.network_first)
    }

    /// Pick the strategy for a URL path.
    pub fn classify(&self, pathname: &str) -> Strategy {
        if self.cache_first.iter().any(|re| re.is_match(pathname)) {
            Strategy::CacheFirst
        } else if self.network_first.iter().any(|re| re.is_match(pathname)) {
            Strategy::NetworkFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }
}
