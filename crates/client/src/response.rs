//! Responses handed back to the application.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use souk_core::CachedResponse;

use crate::fetch::{FetchResponse, Request};

/// Body of the synthetic response served when neither cache nor network can answer.
pub const OFFLINE_BODY: &str = "Offline - content not available";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached root document served in place of an unreachable page.
    OfflineShell,
    /// Fabricated locally (503).
    Synthetic,
}

/// A response as seen by the application.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// The synthetic "offline / unavailable" response.
    pub fn offline() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers,
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
            source: ResponseSource::Synthetic,
        }
    }

    pub fn from_network(fetched: FetchResponse) -> Self {
        Self { status: fetched.status, headers: fetched.headers, body: fetched.bytes, source: ResponseSource::Network }
    }

    pub fn from_cached(entry: CachedResponse, source: ResponseSource) -> Self {
        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers: header_map(&entry.headers),
            body: Bytes::from(entry.body),
            source,
        }
    }

    /// Snapshot this response for storage under `request`'s key.
    pub fn to_cached(&self, request: &Request) -> CachedResponse {
        CachedResponse {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            headers: header_pairs(&self.headers),
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

fn header_map(pairs: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            map.append(name, value);
        }
    }
    map
}
