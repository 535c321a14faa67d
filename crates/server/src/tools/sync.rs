//! sync_submit and sync_drain tool implementations.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use souk_client::{DrainReport, SubmitOutcome, SyncTag, Worker, WorkerEvent, WorkerOutcome};
use souk_core::Error;

/// Parameters for the sync_submit tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncSubmitParams {
    /// Record kind, e.g. "products" or "messages".
    pub kind: String,

    /// JSON payload. A string `id` field becomes the record id.
    pub data: serde_json::Value,

    /// Queue the payload without trying the network first.
    #[serde(default)]
    pub defer: bool,
}

/// Parameters for the sync_drain tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SyncDrainParams {
    /// Record kind to replay. Every configured kind when omitted.
    #[serde(default)]
    pub kind: Option<String>,
}

/// Output from the sync_drain tool.
#[derive(Debug, Clone, Serialize)]
pub struct SyncDrainOutput {
    pub reports: Vec<DrainReport>,
}

/// Implementation of the sync_submit tool.
pub async fn submit_impl(worker: &Worker, params: SyncSubmitParams) -> Result<CallToolResult, McpError> {
    let outcome = if params.defer {
        let record = worker.sync().enqueue(&params.kind, params.data).await?;
        SubmitOutcome::Queued { record }
    } else {
        worker.sync().submit(&params.kind, params.data).await?
    };
    let json = serde_json::to_string_pretty(&outcome).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the sync_drain tool.
///
/// Fires the background-sync trigger of one kind, or of every configured
/// kind, and reports what was replayed.
pub async fn drain_impl(worker: &Worker, params: SyncDrainParams) -> Result<CallToolResult, McpError> {
    let tags = match params.kind {
        Some(kind) if worker.sync().is_known_kind(&kind) => vec![SyncTag::for_kind(kind)],
        Some(kind) => return Err(Error::InvalidInput(format!("unknown record kind: {kind}")).into()),
        None => worker.sync().known_tags(),
    };

    let mut reports = Vec::with_capacity(tags.len());
    for tag in tags {
        if let WorkerOutcome::Synced(report) = worker.dispatch(WorkerEvent::Sync(tag.to_string())).await? {
            reports.push(report);
        }
    }

    let json = serde_json::to_string_pretty(&SyncDrainOutput { reports }).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
