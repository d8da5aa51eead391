//! Database module for bookshelf
//!
//! Handles the SQLite-backed `books` table: schema bootstrap and queries.

mod schema;
mod queries;

pub use schema::{BookStore, StoreOptions};
