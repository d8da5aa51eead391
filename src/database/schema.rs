//! Database schema and initialization

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Connection settings applied when the store is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Use WAL journaling (ignored for in-memory stores)
    pub wal: bool,
    /// How long SQLite waits on a locked database before failing.
    /// Zero means lock contention fails immediately.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            wal: true,
            busy_timeout: Duration::ZERO,
        }
    }
}

/// Owned handle over the `books` table.
///
/// The store owns its connection exclusively. Writes take `&mut self`, reads
/// take `&self`; wrap the store in a `Mutex` to share it between threads.
pub struct BookStore {
    pub(super) conn: Connection,
    path: Option<PathBuf>,
}

impl BookStore {
    /// Open (or create) the store at `path` with default options
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open (or create) the store at `path`.
    ///
    /// Creates missing parent directories and the `books` table. Opening an
    /// existing store leaves its rows untouched.
    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::connection(parent, e))?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::connection(path, e))?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.configure(options)?;
        store.init_schema()?;

        info!("Opened book store at {:?}", path);
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::connection(":memory:", e))?;
        let store = Self { conn, path: None };
        store.configure(&StoreOptions {
            wal: false,
            ..StoreOptions::default()
        })?;
        store.init_schema()?;
        Ok(store)
    }

    fn configure(&self, options: &StoreOptions) -> Result<()> {
        self.conn
            .busy_timeout(options.busy_timeout)
            .map_err(StoreError::Schema)?;

        if options.wal && self.path.is_some() {
            // journal_mode returns a row, so it cannot go through execute_batch
            let mode: String = self
                .conn
                .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
                .map_err(StoreError::Schema)?;
            debug!("Journal mode: {}", mode);
        }
        Ok(())
    }

    /// Create the `books` table if it does not exist
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(StoreError::Schema)?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection and release the database file
    pub fn close(self) -> Result<()> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(":memory:"));
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::connection(&path, e))?;

        info!("Closed book store at {:?}", path);
        Ok(())
    }
}

/// SQL schema for the database.
/// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bookName TEXT,
    cleanedTitle TEXT,
    url TEXT UNIQUE,
    added DATETIME DEFAULT current_timestamp,
    edited DATETIME
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn table_columns(store: &BookStore) -> Vec<String> {
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM pragma_table_info('books') ORDER BY cid")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    #[test]
    fn in_memory_store_has_books_table() {
        let store = BookStore::open_in_memory().unwrap();
        assert_eq!(
            table_columns(&store),
            ["id", "bookName", "cleanedTitle", "url", "added", "edited"]
        );
        assert!(store.path().is_none());
    }

    #[test]
    fn schema_init_is_idempotent() {
        let store = BookStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
        assert_eq!(table_columns(&store).len(), 6);
    }

    #[test]
    fn default_options_fail_fast_on_locks() {
        let options = StoreOptions::default();
        assert!(options.wal);
        assert_eq!(options.busy_timeout, Duration::ZERO);
    }
}
