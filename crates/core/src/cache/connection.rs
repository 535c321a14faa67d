//! Cache database connection management.
//!
//! Opens the SQLite database, applies the shared pragma configuration
//! (WAL mode) and runs the cache migrations.

use crate::Error;
use crate::sqlite::{self, Schema};
use std::path::Path;
use tokio_rusqlite::Connection;

/// Migration list for the cache database.
const SCHEMA: Schema = Schema {
    version_table: "_migrations_cache",
    migrations: &[
        ("1", include_str!("../../migrations/cache/001_partitions.sql")),
        ("2", include_str!("../../migrations/cache/002_worker_meta.sql")),
    ],
};

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = sqlite::open(path, SCHEMA).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = sqlite::open_in_memory(SCHEMA).await?;
        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_schema_applied() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let tables: i64 = db
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                     AND name IN ('cache_partitions', 'cache_entries', 'worker_meta')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 3);
    }
}
