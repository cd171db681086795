//! Intercepted request model.

use serde::{Deserialize, Serialize};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// A request intercepted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: Url, mode: RequestMode) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, mode, headers: Vec::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::default())
    }

    /// A GET issued by a page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}
