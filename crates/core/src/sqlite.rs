//! Shared SQLite plumbing: pragma setup and versioned migrations.
//!
//! The cache partitions and the local store each track applied migrations
//! in their own version table, so both schemas can live in one database
//! file. Each migration is a SQL batch that transforms the schema.

use std::num::ParseIntError;
use std::path::Path;

use crate::Error;
use tokio_rusqlite::{Connection, params};

/// A migration list entry: (version, SQL).
pub(crate) type Migration = (&'static str, &'static str);

/// A versioned schema: the table recording its applied versions plus its
/// ordered migrations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Schema {
    pub(crate) version_table: &'static str,
    pub(crate) migrations: &'static [Migration],
}

/// Open a file-backed connection, apply pragmas and run pending migrations.
pub(crate) async fn open(path: impl AsRef<Path>, schema: Schema) -> Result<Connection, Error> {
    let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
    configure(&conn).await?;
    run_migrations(&conn, schema).await?;
    Ok(conn)
}

/// Open an in-memory connection with the same configuration as file-based ones.
pub(crate) async fn open_in_memory(schema: Schema) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    configure(&conn).await?;
    run_migrations(&conn, schema).await?;
    Ok(conn)
}

async fn configure(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;
        Ok(())
    })
    .await
    .map_err(Error::Database)
}

/// Run any pending migrations.
///
/// Creates the schema's version table if it doesn't exist, checks the
/// current version, and applies every migration that hasn't been run yet.
/// Migrations must be listed in order and each one is idempotent.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub(crate) async fn run_migrations(conn: &Connection, schema: Schema) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        let table = schema.version_table;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )"
            ),
            [],
        )
        .map_err(Error::from)?;

        let current = current_version(conn, table)?;

        for (version, sql) in schema.migrations {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version_num}: {e}")))?;
                tx.execute(
                    &format!("INSERT INTO {table} (version, applied_at) VALUES (?1, ?2)"),
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
                tx.commit()?;
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

/// Highest applied migration version, 0 for a fresh database.
pub(crate) fn current_version(conn: &tokio_rusqlite::rusqlite::Connection, version_table: &str) -> Result<i64, Error> {
    conn.query_row(&format!("SELECT COALESCE(MAX(version), 0) FROM {version_table}"), [], |row| row.get(0))
        .map_err(Error::from)
}
