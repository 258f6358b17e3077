// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use queuedesk_core::QueueDeskError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Handle to the QueueDesk SQLite database.
///
/// Wraps the single `tokio_rusqlite::Connection`; query modules accept
/// `&Database` and run their SQL through [`Connection::call`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, QueueDeskError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(QueueDeskError::transient)?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(QueueDeskError::transient)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, QueueDeskError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(QueueDeskError::transient)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), QueueDeskError> {
        let journal = if wal_mode { "WAL" } else { "DELETE" };
        let applied = self
            .conn
            .call(move |conn| -> Result<usize, QueueDeskError> {
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;"
                ))
                .map_err(QueueDeskError::transient)?;
                crate::migrations::run_migrations(conn)
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => QueueDeskError::transient(other),
            })?;
        debug!(applied, "migrations complete");
        Ok(())
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flushes the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), QueueDeskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into [`QueueDeskError::Transient`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> QueueDeskError {
    QueueDeskError::transient(e)
}
