//! Local store connection and object store management.

use crate::Error;
use crate::sqlite::{self, Schema};
use std::path::Path;
use tokio_rusqlite::{Connection, params};

/// Name of the local store.
pub const STORE_NAME: &str = "souk-offline";

/// Schema version of the local store.
pub const STORE_VERSION: i64 = 1;

const SCHEMA: Schema = Schema {
    version_table: "_migrations_store",
    migrations: &[("1", include_str!("../../migrations/store/001_object_stores.sql"))],
};

/// Handle to the persistent local store.
///
/// The constructors run schema migrations before returning, so a handle is
/// always ready to use. Every operation is a self-contained transaction.
#[derive(Clone, Debug)]
pub struct LocalStore {
    pub(crate) conn: Connection,
}

impl LocalStore {
    /// Open (or create) the store at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = sqlite::open(path, SCHEMA).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = sqlite::open_in_memory(SCHEMA).await?;
        Ok(Self { conn })
    }

    /// Applied schema version.
    pub async fn version(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| sqlite::current_version(conn, SCHEMA.version_table))
            .await
            .map_err(Error::from)
    }

    /// Create an object store keyed by `id` if it doesn't exist yet.
    pub async fn ensure_object_store(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("object store name cannot be empty".into()));
        }
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO object_stores (name, key_path, created_at) VALUES (?1, 'id', ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether an object store exists.
    pub async fn has_object_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM object_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List object store names, sorted.
    pub async fn object_store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM object_stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Approximate bytes held by queued records.
    pub async fn usage_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let bytes: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(length(data) + length(id)), 0) FROM records",
                    [],
                    |row| row.get(0),
                )?;
                Ok(bytes.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_version() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert_eq!(store.version().await.unwrap(), STORE_VERSION);
    }

    #[tokio::test]
    async fn test_default_object_stores() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert_eq!(
            store.object_store_names().await.unwrap(),
            vec!["messages".to_string(), "products".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ensure_object_store_idempotent() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert!(!store.has_object_store("favorites").await.unwrap());

        store.ensure_object_store("favorites").await.unwrap();
        store.ensure_object_store("favorites").await.unwrap();

        assert!(store.has_object_store("favorites").await.unwrap());
        assert_eq!(store.object_store_names().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reopen_keeps_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("souk-offline.sqlite");

        let first = LocalStore::open(&path).await.unwrap();
        drop(first);

        let second = LocalStore::open(&path).await.unwrap();
        assert_eq!(second.version().await.unwrap(), STORE_VERSION);
    }

    #[tokio::test]
    async fn test_shares_file_with_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("souk.sqlite");

        let cache = crate::CacheDb::open(&path).await.unwrap();
        cache.open_partition("static-v1").await.unwrap();
        let store = LocalStore::open(&path).await.unwrap();

        assert_eq!(store.version().await.unwrap(), STORE_VERSION);
        assert_eq!(
            store.object_store_names().await.unwrap(),
            vec!["messages".to_string(), "products".to_string()]
        );
        assert!(cache.has_partition("static-v1").await.unwrap());
    }
}
