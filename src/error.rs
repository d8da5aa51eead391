//! Error types for the book store

use std::fmt;
use std::path::PathBuf;

use rusqlite::ffi;
use thiserror::Error;

/// Result alias used across the store
pub type Result<T> = std::result::Result<T, StoreError>;

/// Book store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database file or its directory could not be opened, created or closed
    #[error("Failed to open database at {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Table creation or connection setup failed
    #[error("Failed to initialize schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// A mutating operation failed and was rolled back
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// A read query or row decoding failed
    #[error("Failed to {context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid page request: page={page}, page_size={page_size} (both must be >= 1)")]
    InvalidPage { page: u32, page_size: u32 },
}

impl StoreError {
    pub(crate) fn connection(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Connection {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn query(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Query { context, source }
    }

    /// True when a write collided with an existing unique value (duplicate url)
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Transaction(TransactionError::UniqueConstraintViolation { .. })
        )
    }

    /// Column named by a unique constraint violation, if this is one
    pub fn violated_column(&self) -> Option<&str> {
        match self {
            StoreError::Transaction(TransactionError::UniqueConstraintViolation { column }) => {
                Some(column)
            }
            _ => None,
        }
    }
}

/// Failure inside a write transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The written value already exists in a UNIQUE column
    #[error("UNIQUE constraint failed on column `{column}`")]
    UniqueConstraintViolation { column: String },

    #[error("Failed to {stage}: {source}")]
    Engine {
        stage: TxStage,
        #[source]
        source: rusqlite::Error,
    },
}

impl TransactionError {
    /// Classify an engine error raised while running `stage`
    pub(crate) fn at(stage: TxStage, source: rusqlite::Error) -> Self {
        match unique_violation_column(&source) {
            Some(column) => TransactionError::UniqueConstraintViolation { column },
            None => TransactionError::Engine { stage, source },
        }
    }

    pub(crate) fn stage(stage: TxStage) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError::Transaction(TransactionError::at(stage, source))
    }
}

/// Step of a write transaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Begin,
    Prepare,
    Execute,
    Commit,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStage::Begin => write!(f, "begin transaction"),
            TxStage::Prepare => write!(f, "prepare statement"),
            TxStage::Execute => write!(f, "execute statement"),
            TxStage::Commit => write!(f, "commit transaction"),
        }
    }
}

/// Extract the column from SQLite's "UNIQUE constraint failed: books.url" failure
fn unique_violation_column(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(e, message)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let column = message
                .as_deref()
                .and_then(|m| m.strip_prefix("UNIQUE constraint failed: "))
                .and_then(|columns| columns.split(',').next())
                .map(|qualified| {
                    let qualified = qualified.trim();
                    qualified
                        .rsplit_once('.')
                        .map_or(qualified, |(_, column)| column)
                        .to_string()
                })
                .unwrap_or_default();
            Some(column)
        }
        _ => None,
    }
}
