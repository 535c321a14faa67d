//! cache_purge tool implementation.
//!
//! Deletes one named partition, or every partition outside the current
//! version's allow-list.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use souk_client::Worker;
use souk_core::Error;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition to delete. When omitted, stale partitions are pruned.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePurgeOutput {
    /// Partitions deleted.
    pub deleted: Vec<String>,
    /// Partitions whose deletion failed.
    pub failed: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &Worker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let output = match params.partition {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("partition cannot be empty".into()).into());
        }
        Some(name) => {
            let deleted = if worker.cache().delete_partition(&name).await? { vec![name] } else { Vec::new() };
            CachePurgeOutput { deleted, failed: Vec::new() }
        }
        None => {
            let report = worker.activate().await;
            CachePurgeOutput { deleted: report.deleted, failed: report.failed }
        }
    };

    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
