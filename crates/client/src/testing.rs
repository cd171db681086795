//! Scriptable network for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use harbor_core::{Error, Response};
use url::Url;

use crate::fetch::{Network, Request};

pub(crate) const ORIGIN: &str = "https://maison.example";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Serves canned responses by absolute URL; unknown URLs get a 404.
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, Response>>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: AtomicUsize::new(0) }
    }

    pub(crate) fn route(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
