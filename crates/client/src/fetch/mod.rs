//! Network seam for the worker.
//!
//! Everything that leaves the process goes through the [`Network`] trait so
//! strategies, lifecycle steps and sync replays can run against a real HTTP
//! client or a test double.
//!
//! ### FetchClient
//! - rustls, gzip/brotli/deflate
//! - Max redirects: 5
//! - Per-request timeout (default 20s); a timeout surfaces as `FETCH_TIMEOUT`
//! - Any HTTP status is a response; only transport failures are errors

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use request::{Destination, Request};
pub use reqwest::{Method, StatusCode, header::HeaderMap};
pub use self::url::{UrlError, canonicalize, is_interceptable, resolve};

use souk_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "souk-worker/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "souk-worker/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&souk_core::AppConfig> for FetchConfig {
    fn from(config: &souk_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Something that can carry a request to the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request and return whatever the server answered.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was received
    /// (offline, DNS failure, timeout, ...).
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error>;
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{} {}", request.method, request.url))
            } else {
                Error::Network(format!("network error: {}", e))
            }
        })?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, headers, bytes, fetch_ms })
    }
}
