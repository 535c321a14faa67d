//! Test helpers for the server crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use souk_client::{FetchResponse, HeaderMap, Network, Request, StatusCode, Worker};
use souk_core::{AppConfig, CacheDb, Error, LocalStore};

/// Network answering every request with the same status, or failing every
/// request while offline.
pub(crate) struct StaticNetwork {
    online: AtomicBool,
    status: u16,
}

impl StaticNetwork {
    pub(crate) fn online(status: u16) -> Arc<Self> {
        Arc::new(Self { online: AtomicBool::new(true), status })
    }

    pub(crate) fn offline() -> Arc<Self> {
        Arc::new(Self { online: AtomicBool::new(false), status: 200 })
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(self.status).unwrap(),
            headers: HeaderMap::new(),
            bytes: "ok".into(),
            fetch_ms: 1,
        })
    }
}

pub(crate) fn test_config() -> AppConfig {
    AppConfig { origin: "https://souk.example".into(), ..Default::default() }
}

pub(crate) async fn test_worker(network: Arc<StaticNetwork>) -> Worker {
    let cache = CacheDb::open_in_memory().await.unwrap();
    let store = LocalStore::open_in_memory().await.unwrap();
    Worker::new(&test_config(), cache, store, network).unwrap()
}

/// Parse the JSON text of a tool result's first content item.
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
