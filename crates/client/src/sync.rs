//! Deferred sync queue.
//!
//! Writes that could not reach the network are stored in the local store,
//! one object store per record kind, and replayed as JSON POSTs to
//! `/api/{kind}` when a `background-sync-{kind}` trigger fires.
//!
//! Delivery is at-least-once: a crash between a successful replay and the
//! local delete submits the record again on the next drain. Records carry no
//! idempotency key, so receiving endpoints must tolerate duplicates.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use souk_core::{Error, LocalStore, PendingRecord};
use tokio::sync::Mutex;
use url::Url;

use crate::fetch::{Network, Request, StatusCode};

/// Prefix shared by every background-sync tag.
pub const SYNC_TAG_PREFIX: &str = "background-sync-";

/// A background-sync trigger for one record kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncTag {
    kind: String,
}

impl SyncTag {
    pub fn for_kind(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    /// Parse `background-sync-{kind}`; anything else is not a sync tag.
    pub fn parse(tag: &str) -> Option<Self> {
        tag.strip_prefix(SYNC_TAG_PREFIX)
            .filter(|kind| !kind.is_empty())
            .map(Self::for_kind)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SYNC_TAG_PREFIX}{}", self.kind)
    }
}

/// Tags waiting for the next sync trigger.
#[derive(Debug, Default)]
pub struct SyncRegistry {
    tags: Mutex<BTreeSet<SyncTag>>,
}

impl SyncRegistry {
    pub async fn register(&self, tag: SyncTag) {
        self.tags.lock().await.insert(tag);
    }

    pub async fn is_registered(&self, tag: &SyncTag) -> bool {
        self.tags.lock().await.contains(tag)
    }

    /// Remove and return every registered tag.
    pub async fn take_pending(&self) -> Vec<SyncTag> {
        std::mem::take(&mut *self.tags.lock().await).into_iter().collect()
    }
}

/// Result of one drain of a record kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    pub kind: String,
    pub attempted: usize,
    /// Ids replayed successfully and removed.
    pub delivered: Vec<String>,
    /// Ids left in place for a later drain.
    pub retained: Vec<String>,
}

/// Outcome of an immediate submission attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The endpoint accepted the payload right away.
    Delivered { http_status: u16 },
    /// The payload was queued for background sync.
    Queued { record: PendingRecord },
    /// The endpoint refused the payload with a client error. Nothing is
    /// queued, since replaying it would be refused the same way.
    Rejected { http_status: u16 },
}

/// Durable queue of writes awaiting replay.
pub struct SyncQueue {
    store: LocalStore,
    network: Arc<dyn Network>,
    origin: Url,
    kinds: Vec<String>,
    registry: SyncRegistry,
}

impl SyncQueue {
    pub fn new(store: LocalStore, network: Arc<dyn Network>, origin: Url, kinds: Vec<String>) -> Self {
        Self { store, network, origin, kinds, registry: SyncRegistry::default() }
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn registry(&self) -> &SyncRegistry {
        &self.registry
    }

    /// Tags for every configured kind.
    pub fn known_tags(&self) -> Vec<SyncTag> {
        self.kinds.iter().map(SyncTag::for_kind).collect()
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }

    fn require_known_kind(&self, kind: &str) -> Result<(), Error> {
        if self.is_known_kind(kind) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("unknown record kind: {kind}")))
        }
    }

    /// Endpoint a record kind is replayed to.
    pub fn replay_endpoint(&self, kind: &str) -> Result<Url, Error> {
        self.origin
            .join(&format!("/api/{kind}"))
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Durably queue a payload and register its sync trigger.
    ///
    /// The record id is the payload's string `id` field when present,
    /// otherwise a fresh UUID.
    pub async fn enqueue(&self, kind: &str, data: serde_json::Value) -> Result<PendingRecord, Error> {
        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.enqueue_with_id(kind, id, data).await
    }

    /// Queue `data` under an explicit record id. `data` is replayed as the
    /// POST body unchanged.
    pub async fn enqueue_with_id(
        &self,
        kind: &str,
        id: impl Into<String>,
        data: serde_json::Value,
    ) -> Result<PendingRecord, Error> {
        self.require_known_kind(kind)?;
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput("record id cannot be empty".into()));
        }
        self.store.ensure_object_store(kind).await?;

        let record =
            PendingRecord { id, data, timestamp: chrono::Utc::now().timestamp_millis(), kind: kind.to_string() };
        self.store.put_record(kind, &record).await?;
        self.registry.register(SyncTag::for_kind(kind)).await;

        tracing::info!(kind, id = %record.id, "queued offline write");
        Ok(record)
    }

    /// Try to deliver a payload now, queueing it if that fails.
    ///
    /// Transport failures and retryable statuses (5xx, 408, 429) are queued.
    /// Any other non-2xx answer is returned as `Rejected` and not queued.
    pub async fn submit(&self, kind: &str, data: serde_json::Value) -> Result<SubmitOutcome, Error> {
        self.require_known_kind(kind)?;
        let endpoint = self.replay_endpoint(kind)?;
        let request = Request::post_json(endpoint, &data)?;

        match self.network.fetch(&request).await {
            Ok(response) if response.is_success() => {
                Ok(SubmitOutcome::Delivered { http_status: response.status.as_u16() })
            }
            Ok(response) if is_retryable(response.status) => {
                tracing::debug!(kind, status = response.status.as_u16(), "submission not accepted yet, queueing");
                let record = self.enqueue(kind, data).await?;
                Ok(SubmitOutcome::Queued { record })
            }
            Ok(response) => {
                tracing::info!(kind, status = response.status.as_u16(), "submission rejected");
                Ok(SubmitOutcome::Rejected { http_status: response.status.as_u16() })
            }
            Err(e) => {
                tracing::debug!(kind, error = %e, "submission failed, queueing");
                let record = self.enqueue(kind, data).await?;
                Ok(SubmitOutcome::Queued { record })
            }
        }
    }

    /// Replay every pending record of `kind`, one at a time.
    ///
    /// Delivered records are deleted; failed ones stay for the next drain and
    /// keep the kind's tag registered. One record failing never stops the
    /// others.
    pub async fn drain(&self, kind: &str) -> DrainReport {
        let mut report = DrainReport { kind: kind.to_string(), ..Default::default() };

        let endpoint = match self.replay_endpoint(kind) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(kind, error = %e, "no replay endpoint");
                return report;
            }
        };

        let records = match self.store.get_all_records(kind).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(kind, error = %e, "failed to read pending records");
                return report;
            }
        };

        for record in records {
            report.attempted += 1;
            if self.replay(&endpoint, &record).await {
                if let Err(e) = self.store.delete_record(kind, &record.id).await {
                    tracing::warn!(kind, id = %record.id, error = %e, "delivered record could not be removed");
                }
                report.delivered.push(record.id);
            } else {
                report.retained.push(record.id);
            }
        }

        if !report.retained.is_empty() {
            self.registry.register(SyncTag::for_kind(kind)).await;
        }

        tracing::info!(
            kind,
            attempted = report.attempted,
            delivered = report.delivered.len(),
            retained = report.retained.len(),
            "sync drain finished"
        );

        report
    }

    async fn replay(&self, endpoint: &Url, record: &PendingRecord) -> bool {
        let request = match Request::post_json(endpoint.clone(), &record.data) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "failed to encode pending record");
                return false;
            }
        };

        match self.network.fetch(&request).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::debug!(id = %record.id, status = response.status.as_u16(), "replay rejected");
                false
            }
            Err(e) => {
                tracing::debug!(id = %record.id, error = %e, "replay failed");
                false
            }
        }
    }

    /// Register the tag of every kind that still holds records, so writes
    /// queued by an earlier process are replayed on the next trigger.
    pub async fn restore_registrations(&self) -> Result<Vec<SyncTag>, Error> {
        let mut restored = Vec::new();
        for (kind, count) in self.pending_counts().await? {
            if count > 0 {
                let tag = SyncTag::for_kind(kind);
                self.registry.register(tag.clone()).await;
                restored.push(tag);
            }
        }
        Ok(restored)
    }

    /// Pending record count for every configured kind.
    pub async fn pending_counts(&self) -> Result<Vec<(String, u64)>, Error> {
        let mut counts = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            counts.push((kind.clone(), self.store.count_records(kind).await?));
        }
        Ok(counts)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS
}
