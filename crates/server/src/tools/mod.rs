//! MCP tool implementations.
//!
//! This module contains all tools exposed by the souk worker server.

pub mod cache;
pub mod fetch;
pub mod status;
pub mod sync;

pub use fetch::WorkerFetchParams;
pub use sync::{SyncDrainParams, SyncSubmitParams};
