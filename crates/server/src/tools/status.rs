//! worker_status and app_update tool implementations.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use souk_client::{AppState, ClientHook, StorageEstimate, Worker};
use souk_core::Error;

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: u64,
    /// Part of the current version's allow-list.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub kind: String,
    pub pending: u64,
    pub registered: bool,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatusOutput {
    pub version: String,
    pub origin: String,
    pub app: AppState,
    pub partitions: Vec<PartitionStatus>,
    pub queues: Vec<QueueStatus>,
    pub storage: Option<StorageEstimate>,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(worker: &Worker, hook: &ClientHook) -> Result<CallToolResult, McpError> {
    let cache = worker.cache();
    let mut partitions = Vec::new();
    for name in cache.partition_names().await? {
        let entries = cache.count_entries(&name).await?;
        let current = worker.partitions().contains(&name);
        partitions.push(PartitionStatus { name, entries, current });
    }

    let mut queues = Vec::new();
    for (tag, (kind, pending)) in worker.sync().known_tags().into_iter().zip(worker.sync().pending_counts().await?) {
        let registered = worker.sync().registry().is_registered(&tag).await;
        queues.push(QueueStatus { kind, pending, registered });
    }

    let output = WorkerStatusOutput {
        version: worker.partitions().version().to_string(),
        origin: worker.origin().to_string(),
        app: hook.state(),
        partitions,
        queues,
        storage: hook.storage_estimate().await,
    };
    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the app_update tool.
///
/// Reloads onto the waiting worker version: the cached shell and assets of
/// the current version are refreshed and stale partitions pruned.
pub async fn update_impl(worker: &Worker, hook: &ClientHook) -> Result<CallToolResult, McpError> {
    let was_available = hook.state().update_available;
    hook.update_app().await;

    let installed = worker.install().await;
    let activated = worker.activate().await;

    let json = serde_json::to_string_pretty(&serde_json::json!({
        "update_was_available": was_available,
        "install": installed,
        "activate": activated,
        "app": hook.state(),
    }))
    .map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
