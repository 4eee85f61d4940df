use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use crate::error::{Result, StoreError};
use crate::table::{SqlParam, Table};

/// Shape of the externally populated `reddit_activity` table.
///
/// The dashboard never runs this; it exists so tests and local fixtures can
/// build a store that looks like the one the ingestion job produces.
pub const FIXTURE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reddit_activity (
    author          TEXT NOT NULL,
    moon_week       INTEGER,
    created_date    TEXT NOT NULL,
    post_type       TEXT NOT NULL,
    adjusted_score  REAL NOT NULL DEFAULT 0,
    post_flair_type TEXT
);
";

/// Runs one statement against the store and hands back every row.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Table>;

    /// Whether the backing store is there at all.
    fn store_exists(&self) -> bool;

    /// Human-readable location of the store, for captions and errors.
    fn location(&self) -> &Path;
}

/// Executor over an on-disk SQLite file.
///
/// Each call opens its own read-only connection and drops it before
/// returning, on success and on failure alike. Nothing is held between calls.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    path: PathBuf,
}

impl SqliteExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a read-only connection. A missing file is reported as
    /// [`StoreError::NotFound`] rather than letting SQLite fail opaquely.
    pub fn open_readonly(&self) -> Result<Connection> {
        if !self.store_exists() {
            return Err(StoreError::NotFound {
                path: self.path.clone(),
            });
        }
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Table> {
        let conn = self.open_readonly()?;
        let table = {
            let mut stmt = conn.prepare(sql)?;
            Table::collect(&mut stmt, params)?
        };
        // Explicit close so a close-time failure is not silently swallowed.
        conn.close().map_err(|(_, e)| StoreError::DataAccess(e))?;
        Ok(table)
    }

    fn store_exists(&self) -> bool {
        self.path.is_file()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
