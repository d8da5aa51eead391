//! bookshelf - SQLite-backed book catalogue
//!
//! [`BookStore`] owns a SQLite connection over a single `books` table and
//! exposes insert, update, delete, paginated listing and case-insensitive
//! substring filtering.

pub mod config;
pub mod database;
pub mod error;

pub use bookshelf_core::{Book, NewBook, PageRequest, DEFAULT_PAGE_SIZE};
pub use database::{BookStore, StoreOptions};
pub use error::{Result, StoreError, TransactionError, TxStage};
