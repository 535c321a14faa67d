//! Offline worker for souk.
//!
//! This crate provides the request interceptor, the cache-first and
//! network-first fetch strategies, cache partition lifecycle, the deferred
//! sync queue and the client-facing lifecycle/connectivity hook. The server
//! binary drives it; tests drive it through a mock network.

pub mod fetch;
pub mod hook;
pub mod intercept;
pub mod lifecycle;
pub mod partition;
pub mod response;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{Destination, FetchClient, FetchConfig, FetchResponse, HeaderMap, Method, Network, Request, StatusCode};
pub use hook::{
    AppState, ClientHook, DisplayMode, Effect, HookEvent, InstallPrompt, Notice, PromptOutcome, StorageEstimator,
};
pub use intercept::{Route, RouteTable, Strategy};
pub use lifecycle::{ActivateReport, InstallReport};
pub use partition::{PartitionKind, PartitionSet};
pub use response::{Response, ResponseSource};
pub use sync::{DrainReport, SubmitOutcome, SyncQueue, SyncRegistry, SyncTag};
pub use worker::{StorageEstimate, Worker, WorkerEvent, WorkerOutcome};
