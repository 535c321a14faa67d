//! cache_get tool implementation.
//!
//! Looks up the cached response stored for a request.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use souk_client::{PartitionKind, Worker};
use souk_core::Error;
use souk_core::cache::hash::compute_request_key;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method the response was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Partition to search: "static", "dynamic", "api", or a full partition
    /// name. Every partition when omitted.
    #[serde(default)]
    pub partition: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub request_key: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub stored_at: String,
}

fn partition_name(worker: &Worker, partition: &str) -> String {
    PartitionKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == partition)
        .map_or_else(|| partition.to_string(), |kind| worker.partitions().name(kind))
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;
    let method = params.method.to_ascii_uppercase();

    let entry = match params.partition.as_deref() {
        Some(partition) => {
            let name = partition_name(worker, partition);
            worker.cache().match_entry(&name, &method, url.as_str()).await?
        }
        None => worker.cache().match_any(&method, url.as_str()).await?,
    }
    .ok_or_else(|| Error::CacheMiss(format!("{method} {url}")))?;

    let output = CacheGetOutput {
        request_key: compute_request_key(&entry.method, &entry.url),
        url: entry.url,
        status: entry.status,
        headers: entry.headers,
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticNetwork, output_json, test_worker};

    fn params(url: &str, partition: Option<&str>) -> CacheGetParams {
        CacheGetParams { url: url.into(), method: default_method(), partition: partition.map(String::from) }
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let worker = test_worker(StaticNetwork::offline()).await;

        let result = get_impl(&worker, params("/manifest.json", None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let worker = test_worker(StaticNetwork::online(200)).await;
        worker.install().await;

        let result = get_impl(&worker, params("/manifest.json", Some("static"))).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["url"], "https://souk.example/manifest.json");
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "ok");
    }

    #[tokio::test]
    async fn test_get_impl_wrong_partition() {
        let worker = test_worker(StaticNetwork::online(200)).await;
        worker.install().await;

        let result = get_impl(&worker, params("/manifest.json", Some("souk-api-v1"))).await;
        assert!(result.is_err());
    }
}
