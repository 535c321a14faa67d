//! worker_fetch tool implementation.
//!
//! Sends a request through the worker's interceptor, exactly as the
//! application would.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use souk_client::{Destination, Request, ResponseSource, Worker};
use souk_core::Error;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, image, script, style, font, manifest
    /// or empty (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Treat the request as a top-level navigation.
    #[serde(default)]
    pub navigate: bool,

    /// JSON body, sent with `Content-Type: application/json`.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub body: String,
}

pub(crate) fn build_request(worker: &Worker, params: WorkerFetchParams) -> Result<Request, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let url = worker.resolve(&params.url)?;
    let mut request = Request::with_method(&params.method, url)?;

    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }
    if params.navigate {
        request.navigate = true;
    }
    if let Some(body) = params.body.as_ref() {
        request = request.with_json_body(body)?;
    }

    Ok(request)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, params)?;
    let response = worker.handle_fetch(&request).await?;

    let output = WorkerFetchOutput {
        url: request.url.to_string(),
        status: response.status.as_u16(),
        source: response.source,
        content_type: response.content_type().map(String::from),
        body: response.text(),
    };
    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
