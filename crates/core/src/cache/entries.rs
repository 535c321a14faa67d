//! Cached response entries.
//!
//! An entry is immutable once written except for outright replacement by a
//! newer successful response for the same request key.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response snapshot stored inside a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Whether the status is an HTTP success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn request_key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

type EntryRow = (String, String, u16, String, Vec<u8>, String);

fn read_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn decode_entry((method, url, status, headers_json, body, stored_at): EntryRow) -> Result<CachedResponse, Error> {
    let headers = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { method, url, status, headers, body, stored_at })
}

impl CacheDb {
    /// Store a response in a partition, replacing any entry for the same request.
    ///
    /// The partition is created if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotCacheable` for non-2xx responses.
    pub async fn put_entry(&self, partition: &str, entry: &CachedResponse) -> Result<(), Error> {
        if !entry.is_success() {
            return Err(Error::NotCacheable(entry.status));
        }
        if partition.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let partition = partition.to_string();
        let request_key = entry.request_key();
        let headers_json = serde_json::to_string(&entry.headers)?;
        let entry = entry.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        partition, request_key, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(partition, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        partition,
                        request_key,
                        entry.method.to_ascii_uppercase(),
                        entry.url,
                        entry.status,
                        headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a request in one partition.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn match_entry(&self, partition: &str, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let partition = partition.to_string();
        let request_key = compute_request_key(method, url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status, headers_json, body, stored_at
                     FROM cache_entries WHERE partition = ?1 AND request_key = ?2",
                    params![partition, request_key],
                    read_entry_row,
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    /// Look up the entry for a request across every partition.
    ///
    /// The most recently stored entry wins when several partitions hold one.
    pub async fn match_any(&self, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let request_key = compute_request_key(method, url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status, headers_json, body, stored_at
                     FROM cache_entries WHERE request_key = ?1
                     ORDER BY stored_at DESC LIMIT 1",
                    params![request_key],
                    read_entry_row,
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    /// Number of entries held by a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE partition = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(url: &str, status: u16, body: &str) -> CachedResponse {
        CachedResponse {
            method: "GET".to_string(),
            url: url.to_string(),
            status,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://souk.example/", 200, "<html>shell</html>");

        db.put_entry("souk-static-v1", &entry).await.unwrap();

        let found = db
            .match_entry("souk-static-v1", "GET", "https://souk.example/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, entry);
        assert_eq!(found.header("Content-Type"), Some("text/html"));
        assert!(db.has_partition("souk-static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db
            .match_entry("souk-static-v1", "GET", "https://souk.example/nothing")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("souk-dynamic-v1", &make_entry("https://souk.example/a", 200, "a"))
            .await
            .unwrap();

        let other = db
            .match_entry("souk-api-v1", "GET", "https://souk.example/a")
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_non_success_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db
            .put_entry("souk-api-v1", &make_entry("https://souk.example/api/products", 500, "boom"))
            .await;

        assert!(matches!(result, Err(Error::NotCacheable(500))));
        assert_eq!(db.count_entries("souk-api-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replacement_last_writer_wins() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://souk.example/api/products";
        db.put_entry("souk-api-v1", &make_entry(url, 200, "old")).await.unwrap();
        db.put_entry("souk-api-v1", &make_entry(url, 200, "new")).await.unwrap();

        let found = db.match_entry("souk-api-v1", "GET", url).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.count_entries("souk-api-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_any_across_partitions() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("souk-static-v1", &make_entry("https://souk.example/", 200, "shell"))
            .await
            .unwrap();

        let found = db.match_any("GET", "https://souk.example/").await.unwrap().unwrap();
        assert_eq!(found.body, b"shell");
        assert!(db.match_any("GET", "https://souk.example/other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_partition_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("souk-static-v0", &make_entry("https://souk.example/", 200, "old shell"))
            .await
            .unwrap();

        db.delete_partition("souk-static-v0").await.unwrap();

        assert!(db.match_any("GET", "https://souk.example/").await.unwrap().is_none());
        assert_eq!(db.usage_bytes().await.unwrap(), 0);
    }
}
