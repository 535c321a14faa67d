//! Worker event dispatch.
//!
//! Lifecycle, fetch and sync events arrive as [`WorkerEvent`] values and are
//! routed to the lifecycle steps, the fetch strategies or the sync queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use souk_core::{AppConfig, CacheDb, Error, LocalStore};
use url::Url;

use crate::fetch::{Network, Request, resolve};
use crate::hook::StorageEstimator;
use crate::intercept::{RouteTable, Strategy};
use crate::lifecycle::{self, ActivateReport, InstallReport};
use crate::partition::PartitionSet;
use crate::response::Response;
use crate::strategy;
use crate::sync::{DrainReport, SyncQueue, SyncTag};

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    /// A background-sync trigger, identified by its tag.
    Sync(String),
}

#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Response(Response),
    Synced(DrainReport),
    /// The event was not meant for this worker.
    Ignored,
}

/// Storage usage and quota, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageEstimate {
    pub usage_bytes: u64,
    pub quota_bytes: u64,
}

pub struct Worker {
    cache: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    routes: RouteTable,
    partitions: PartitionSet,
    manifest: Vec<Url>,
    offline_shell: Url,
    sync: SyncQueue,
    quota_bytes: u64,
}

impl Worker {
    /// Build a worker from configuration and already opened stores.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_URL` if the origin, a static asset or the offline
    /// shell path does not resolve to a URL.
    pub fn new(config: &AppConfig, cache: CacheDb, store: LocalStore, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;

        let manifest = config
            .static_assets
            .iter()
            .map(|asset| resolve(&origin, asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let offline_shell = resolve(&origin, &config.offline_shell_path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.offline_shell_path)))?;

        let sync = SyncQueue::new(store, network.clone(), origin.clone(), config.sync_kinds.clone());

        Ok(Self {
            cache,
            network,
            origin,
            routes: RouteTable::from_config(config),
            partitions: PartitionSet::new(config.cache_version.clone()),
            manifest,
            offline_shell,
            sync,
            quota_bytes: config.quota_bytes,
        })
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn sync(&self) -> &SyncQueue {
        &self.sync
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve a path or absolute URL against the origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(&self.origin, target).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Handle one event.
    ///
    /// Only a pass-through fetch can fail; everything else contains its
    /// failures and reports them in the outcome.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<WorkerOutcome, Error> {
        match event {
            WorkerEvent::Install => Ok(WorkerOutcome::Installed(self.install().await)),
            WorkerEvent::Activate => Ok(WorkerOutcome::Activated(self.activate().await)),
            WorkerEvent::Fetch(request) => self.handle_fetch(&request).await.map(WorkerOutcome::Response),
            WorkerEvent::Sync(tag) => Ok(self
                .handle_sync(&tag)
                .await
                .map_or(WorkerOutcome::Ignored, WorkerOutcome::Synced)),
        }
    }

    pub async fn install(&self) -> InstallReport {
        lifecycle::install(&self.cache, self.network.as_ref(), &self.partitions, &self.manifest).await
    }

    pub async fn activate(&self) -> ActivateReport {
        lifecycle::activate(&self.cache, &self.partitions).await
    }

    /// Serve a request through the interceptor.
    ///
    /// Intercepted requests always produce a response. Requests the
    /// interceptor passes through go to the network untouched, so their
    /// transport errors are returned as-is.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        let Some(route) = self.routes.classify(request) else {
            tracing::debug!(method = %request.method, url = %request.url, "pass-through");
            return self.network.fetch(request).await.map(Response::from_network);
        };

        let partition = self.partitions.name(route.partition);
        let network = self.network.as_ref();
        let response = match route.strategy {
            Strategy::CacheFirst => strategy::cache_first(&self.cache, network, request, &partition).await,
            Strategy::NetworkFirst => {
                strategy::network_first(&self.cache, network, request, &partition, Some(&self.offline_shell)).await
            }
        };

        Ok(response)
    }

    /// Drain the queue behind a sync tag; tags for unknown kinds are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Option<DrainReport> {
        let Some(tag) = SyncTag::parse(tag).filter(|t| self.sync.is_known_kind(t.kind())) else {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return None;
        };
        Some(self.sync.drain(tag.kind()).await)
    }

    pub async fn estimate_storage(&self) -> Result<StorageEstimate, Error> {
        let cache = self.cache.usage_bytes().await?;
        let store = self.sync.store().usage_bytes().await?;
        Ok(StorageEstimate { usage_bytes: cache + store, quota_bytes: self.quota_bytes })
    }
}

#[async_trait]
impl StorageEstimator for Worker {
    async fn estimate(&self) -> Result<StorageEstimate, Error> {
        self.estimate_storage().await
    }
}
