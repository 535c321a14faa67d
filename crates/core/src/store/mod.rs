//! Persistent local store for work queued while offline.
//!
//! A single named, versioned SQLite database organised into object stores.
//! Each object store holds records keyed by `id`; the object store a record
//! lives in gives it its kind (products, messages, ...).

pub mod connection;
pub mod records;

pub use connection::{LocalStore, STORE_NAME, STORE_VERSION};
pub use records::PendingRecord;
