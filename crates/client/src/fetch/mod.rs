//! Network seam for the worker.
//!
//! ### Failure model
//! - Only transport failures (DNS, connect, reset, timeout, oversized body)
//!   are `Err`; they are what the strategies treat as "offline".
//! - HTTP error statuses come back as `Ok` responses, and the strategies
//!   decide what to do with them.
//!
//! ### HTTP implementation
//! - rustls, gzip/brotli/deflate
//! - Max redirects: 5
//! - Max body bytes: configurable (default 10MB)
//! - No timeout unless one is configured

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use request::{Request, RequestMode};
pub use url::{UrlError, is_same_origin, resolve};

use harbor_core::{AppConfig, Error, Response};

/// Something that can perform a request on the worker's behalf.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. `Err` means no response was obtained at all.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "harbor-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "harbor-sw/0.1".to_string(), max_bytes: 10 * 1024 * 1024, timeout: None, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

fn collect_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());

        let bytes: Bytes = response.bytes().await.map_err(transport_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
            url: Some(final_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "harbor-sw/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), timeout_ms: Some(2500), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.max_bytes, app.max_bytes);
    }

    #[test]
    fn test_collect_headers() {
        let mut map = header::HeaderMap::new();
        map.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("image/png"));
        let headers = collect_headers(&map);
        assert_eq!(headers, vec![("content-type".to_string(), "image/png".to_string())]);
    }

    #[tokio::test]
    async fn test_http_network_new() {
        let network = HttpNetwork::new(FetchConfig::default());
        assert!(network.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let network = HttpNetwork::new(FetchConfig { timeout: Some(Duration::from_secs(5)), ..Default::default() })
            .unwrap();
        let url = ::url::Url::parse("http://127.0.0.1:9/offline").unwrap();
        let err = network.fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::Network(_) | Error::FetchTimeout(_)), "{err}");
    }
}
