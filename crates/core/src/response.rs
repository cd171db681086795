//! Response model shared by the cache store and the strategy executor.

use serde::{Deserialize, Serialize};

/// Body served when neither network nor cache can answer.
pub const OFFLINE_BODY: &str = "Offline";

/// An HTTP response as stored in, and served from, the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Final URL the response came from, if known.
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: String::new(), headers: Vec::new(), body: body.into(), url: None }
    }

    /// The synthetic `503 Offline` response.
    pub fn offline() -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: OFFLINE_BODY.as_bytes().to_vec(),
            url: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
