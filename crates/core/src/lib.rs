//! Core types and shared functionality for souk.
//!
//! This crate provides:
//! - Cache partitions for HTTP responses with SQLite backend
//! - The persistent local store for pending offline records
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

mod sqlite;

pub use cache::{CacheDb, CachedResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{LocalStore, PendingRecord};
