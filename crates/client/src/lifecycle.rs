//! Install and activate steps of the worker lifecycle.
//!
//! Both steps fan out independent per-item operations and settle all of
//! them: one asset failing to pre-cache, or one stale partition failing to
//! delete, never stops the others.

use futures_util::future::join_all;
use serde::Serialize;
use souk_core::CacheDb;
use souk_core::cache::meta::ACTIVE_VERSION_KEY;
use url::Url;

use crate::fetch::{Network, Request};
use crate::partition::{PartitionKind, PartitionSet};
use crate::response::Response;

/// Outcome of the install step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    /// Version being installed.
    pub version: String,
    /// Version of the worker that was active before this install, if any.
    pub previous_version: Option<String>,
    /// Static assets stored in the static partition.
    pub cached: Vec<String>,
    /// Static assets that could not be fetched or stored.
    pub failed: Vec<String>,
    /// The new worker takes over without waiting for old instances.
    pub skip_waiting: bool,
}

impl InstallReport {
    /// Whether an older worker version was controlling clients.
    pub fn replaces_controller(&self) -> bool {
        self.previous_version
            .as_deref()
            .is_some_and(|previous| previous != self.version)
    }
}

/// Outcome of the activate step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    /// Stale partitions removed.
    pub deleted: Vec<String>,
    /// Stale partitions whose deletion failed.
    pub failed: Vec<String>,
    /// Partitions in the current allow-list.
    pub kept: Vec<String>,
    pub clients_claimed: bool,
}

/// Open every current partition and pre-populate the static one.
pub async fn install(
    cache: &CacheDb, network: &dyn Network, partitions: &PartitionSet, manifest: &[Url],
) -> InstallReport {
    let previous_version = match cache.get_meta(ACTIVE_VERSION_KEY).await {
        Ok(version) => version,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read active worker version");
            None
        }
    };

    for name in partitions.names() {
        if let Err(e) = cache.open_partition(&name).await {
            tracing::warn!(partition = %name, error = %e, "failed to open partition");
        }
    }

    let static_partition = partitions.name(PartitionKind::Static);
    let results = join_all(
        manifest
            .iter()
            .map(|url| precache(cache, network, &static_partition, url)),
    )
    .await;

    let mut report = InstallReport {
        version: partitions.version().to_string(),
        previous_version,
        skip_waiting: true,
        ..Default::default()
    };
    for (url, ok) in manifest.iter().zip(results) {
        if ok {
            report.cached.push(url.to_string());
        } else {
            report.failed.push(url.to_string());
        }
    }

    tracing::info!(
        version = %report.version,
        cached = report.cached.len(),
        failed = report.failed.len(),
        "worker installed"
    );

    report
}

async fn precache(cache: &CacheDb, network: &dyn Network, partition: &str, url: &Url) -> bool {
    let request = Request::get(url.clone());
    let fetched = match network.fetch(&request).await {
        Ok(fetched) if fetched.is_success() => fetched,
        Ok(fetched) => {
            tracing::warn!(url = %url, status = fetched.status.as_u16(), "static asset not cached");
            return false;
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "static asset not cached");
            return false;
        }
    };

    let response = Response::from_network(fetched);
    match cache.put_entry(partition, &response.to_cached(&request)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "failed to store static asset");
            false
        }
    }
}

/// Delete stale partitions, record the active version and claim clients.
pub async fn activate(cache: &CacheDb, partitions: &PartitionSet) -> ActivateReport {
    let names = match cache.partition_names().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "failed to enumerate partitions");
            Vec::new()
        }
    };

    let (kept, stale): (Vec<String>, Vec<String>) = names.into_iter().partition(|name| partitions.contains(name));

    let results = join_all(stale.iter().map(|name| cache.delete_partition(name))).await;

    let mut report = ActivateReport { kept, clients_claimed: true, ..Default::default() };
    for (name, result) in stale.into_iter().zip(results) {
        match result {
            Ok(_) => {
                tracing::info!(partition = %name, "deleted stale partition");
                report.deleted.push(name);
            }
            Err(e) => {
                tracing::warn!(partition = %name, error = %e, "failed to delete stale partition");
                report.failed.push(name);
            }
        }
    }

    if let Err(e) = cache.set_meta(ACTIVE_VERSION_KEY, partitions.version()).await {
        tracing::warn!(error = %e, "failed to record active worker version");
    }

    tracing::info!(version = partitions.version(), deleted = report.deleted.len(), "worker activated");

    report
}
