//! Fixed partition names for the current deployment.

use serde::{Deserialize, Serialize};

/// The fixed set of response cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Pre-cached application shell and assets.
    Static,
    /// Everything else fetched at runtime: pages, images.
    Dynamic,
    /// Backend API responses.
    Api,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Static, PartitionKind::Dynamic, PartitionKind::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
            PartitionKind::Api => "api",
        }
    }
}

/// Partition names for one deployment version, e.g. `souk-static-v1`.
///
/// Any existing partition whose name is not in this set is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    version: String,
}

impl PartitionSet {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self, kind: PartitionKind) -> String {
        format!("souk-{}-{}", kind.as_str(), self.version)
    }

    /// The allow-list of current partition names.
    pub fn names(&self) -> Vec<String> {
        PartitionKind::ALL.iter().map(|kind| self.name(*kind)).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        PartitionKind::ALL.iter().any(|kind| self.name(*kind) == name)
    }
}
