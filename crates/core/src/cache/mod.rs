//! SQLite-backed response cache partitions.
//!
//! This module provides named, isolated collections of captured HTTP
//! responses using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Partition creation, enumeration and wholesale deletion
//! - Request keys derived from method and URL using SHA-256
//! - Success-only entries with last-writer-wins replacement
//! - Worker lifecycle metadata

pub mod connection;
pub mod entries;
pub mod hash;
pub mod meta;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
