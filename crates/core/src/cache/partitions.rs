//! Partition lifecycle operations.
//!
//! At most one partition exists per name. Deleting a partition removes
//! every entry it holds.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create a partition if it doesn't exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a partition exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every partition name, sorted.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition with that name existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Approximate bytes held by all partitions.
    pub async fn usage_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let bytes: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(length(body) + length(headers_json) + length(url)), 0) FROM cache_entries",
                    [],
                    |row| row.get(0),
                )?;
                Ok(bytes.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}
