//! Pending offline record operations.

use super::connection::LocalStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A unit of work queued while the network write could not be completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PendingRecord {
    /// Unique key within its object store.
    pub id: String,
    /// Payload submitted on replay.
    pub data: serde_json::Value,
    /// Milliseconds since the Unix epoch at enqueue time.
    pub timestamp: i64,
    /// Record kind; matches the object store the record lives in.
    #[serde(rename = "type")]
    pub kind: String,
}

type RecordRow = (String, String, i64, String);

fn decode_record((id, data, timestamp, kind): RecordRow) -> Result<PendingRecord, Error> {
    Ok(PendingRecord { id, data: serde_json::from_str(&data)?, timestamp, kind })
}

impl LocalStore {
    /// Insert or replace a record in an object store.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownObjectStore` if the object store doesn't exist.
    pub async fn put_record(&self, store: &str, record: &PendingRecord) -> Result<(), Error> {
        if record.id.is_empty() {
            return Err(Error::InvalidInput("record id cannot be empty".into()));
        }
        let store = store.to_string();
        let data = serde_json::to_string(&record.data)?;
        let record = record.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM object_stores WHERE name = ?1)",
                    params![store],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::UnknownObjectStore(store));
                }
                tx.execute(
                    "INSERT INTO records (store, id, kind, data, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(store, id) DO UPDATE SET
                        kind = excluded.kind,
                        data = excluded.data,
                        timestamp = excluded.timestamp",
                    params![store, record.id, record.kind, data, record.timestamp],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a record by id.
    pub async fn get_record(&self, store: &str, id: &str) -> Result<Option<PendingRecord>, Error> {
        let store = store.to_string();
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<RecordRow>, Error> {
                let result = conn.query_row(
                    "SELECT id, data, timestamp, kind FROM records WHERE store = ?1 AND id = ?2",
                    params![store, id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_record).transpose()
    }

    /// Get every record of an object store, oldest first.
    ///
    /// An object store that doesn't exist yields no records.
    pub async fn get_all_records(&self, store: &str) -> Result<Vec<PendingRecord>, Error> {
        let store = store.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<RecordRow>, Error> {
                let mut stmt =
                    conn.prepare("SELECT id, data, timestamp, kind FROM records WHERE store = ?1 ORDER BY timestamp, id")?;
                let rows = stmt
                    .query_map(params![store], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
                    .collect::<Result<Vec<RecordRow>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(decode_record).collect()
    }

    /// Delete a record.
    ///
    /// Returns false if the record didn't exist.
    pub async fn delete_record(&self, store: &str, id: &str) -> Result<bool, Error> {
        let store = store.to_string();
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM records WHERE store = ?1 AND id = ?2", params![store, id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of records held by an object store.
    pub async fn count_records(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM records WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_record(id: &str, timestamp: i64) -> PendingRecord {
        PendingRecord { id: id.to_string(), data: json!({ "title": "Lamp" }), timestamp, kind: "products".to_string() }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let record = make_record("p1", 1_700_000_000_000);

        store.put_record("products", &record).await.unwrap();

        let found = store.get_record("products", "p1").await.unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(make_record("p1", 5)).unwrap();
        assert_eq!(value, json!({ "id": "p1", "data": { "title": "Lamp" }, "timestamp": 5, "type": "products" }));
    }

    #[tokio::test]
    async fn test_unknown_object_store() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let result = store.put_record("drafts", &make_record("d1", 1)).await;
        assert!(matches!(result, Err(Error::UnknownObjectStore(name)) if name == "drafts"));
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_timestamp() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.put_record("products", &make_record("late", 30)).await.unwrap();
        store.put_record("products", &make_record("early", 10)).await.unwrap();
        store.put_record("products", &make_record("middle", 20)).await.unwrap();

        let ids: Vec<String> = store
            .get_all_records("products")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_records_isolated_by_store() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.put_record("products", &make_record("x1", 1)).await.unwrap();

        assert_eq!(store.count_records("products").await.unwrap(), 1);
        assert_eq!(store.count_records("messages").await.unwrap(), 0);
        assert!(store.get_record("messages", "x1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_record() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.put_record("products", &make_record("p1", 1)).await.unwrap();

        assert!(store.delete_record("products", "p1").await.unwrap());
        assert!(!store.delete_record("products", "p1").await.unwrap());
        assert!(store.get_record("products", "p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("souk-offline.sqlite");

        {
            let store = LocalStore::open(&path).await.unwrap();
            store.put_record("products", &make_record("p1", 1)).await.unwrap();
            store.put_record("products", &make_record("p2", 2)).await.unwrap();
        }

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.count_records("products").await.unwrap(), 2);
        assert!(reopened.usage_bytes().await.unwrap() > 0);
    }
}
