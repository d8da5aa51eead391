//! Book query operations
//!
//! Writes run in their own transaction; reads run directly on the connection.
//! Filters use LIKE substring matching. `%` and `_` in a filter are not
//! escaped and act as wildcards. Both the column and the filter are folded
//! with SQLite's `lower()`, which only folds ASCII: non-ASCII letters match
//! in their exact case only ("Émile" finds "Émile", "émile" does not).

use bookshelf_core::{Book, NewBook, PageRequest};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::BookStore;
use crate::error::{Result, StoreError, TransactionError, TxStage};

const BOOK_COLUMNS: &str = "id, bookName, cleanedTitle, url, added, edited";

/// Column a filtered listing matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterColumn {
    CleanedTitle,
    BookName,
}

impl FilterColumn {
    fn sql_name(self) -> &'static str {
        match self {
            FilterColumn::CleanedTitle => "cleanedTitle",
            FilterColumn::BookName => "bookName",
        }
    }
}

fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        book_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        cleaned_title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        added: row.get(4)?,
        edited: row.get(5)?,
    })
}

/// LIMIT/OFFSET pair for a page request
fn limit_offset(page: PageRequest) -> Result<(i64, i64)> {
    let invalid = || StoreError::InvalidPage {
        page: page.page,
        page_size: page.page_size,
    };
    let offset = page.offset().ok_or_else(invalid)?;
    let offset = i64::try_from(offset).map_err(|_| invalid())?;
    Ok((i64::from(page.page_size), offset))
}

impl BookStore {
    /// Insert a book and return the id the store assigned to it.
    ///
    /// A duplicate `url` fails with a unique constraint violation and leaves
    /// the table unchanged.
    pub fn insert(&mut self, book: &NewBook) -> Result<i64> {
        let tx = self
            .conn
            .transaction()
            .map_err(TransactionError::stage(TxStage::Begin))?;

        let id = {
            let mut stmt = tx
                .prepare("INSERT INTO books (bookName, cleanedTitle, url) VALUES (?1, ?2, ?3)")
                .map_err(TransactionError::stage(TxStage::Prepare))?;
            stmt.insert(params![book.book_name, book.cleaned_title, book.url])
                .map_err(TransactionError::stage(TxStage::Execute))?
        };

        tx.commit()
            .map_err(TransactionError::stage(TxStage::Commit))?;

        debug!("Inserted book {} ({})", id, book.url);
        Ok(id)
    }

    /// Overwrite name, title and url of the book with `id` and stamp `edited`.
    ///
    /// Updating an id that does not exist succeeds without touching anything.
    pub fn update(&mut self, id: i64, book: &NewBook) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(TransactionError::stage(TxStage::Begin))?;

        let changed = {
            let mut stmt = tx
                .prepare(
                    r#"
                    UPDATE books
                    SET bookName = ?1, cleanedTitle = ?2, url = ?3, edited = current_timestamp
                    WHERE id = ?4
                    "#,
                )
                .map_err(TransactionError::stage(TxStage::Prepare))?;
            stmt.execute(params![book.book_name, book.cleaned_title, book.url, id])
                .map_err(TransactionError::stage(TxStage::Execute))?
        };

        tx.commit()
            .map_err(TransactionError::stage(TxStage::Commit))?;

        debug!("Updated book {} ({} rows)", id, changed);
        Ok(())
    }

    /// Delete the book with `id`. Missing ids are not an error.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(TransactionError::stage(TxStage::Begin))?;

        let removed = {
            let mut stmt = tx
                .prepare("DELETE FROM books WHERE id = ?1")
                .map_err(TransactionError::stage(TxStage::Prepare))?;
            stmt.execute(params![id])
                .map_err(TransactionError::stage(TxStage::Execute))?
        };

        tx.commit()
            .map_err(TransactionError::stage(TxStage::Commit))?;

        debug!("Deleted book {} ({} rows)", id, removed);
        Ok(())
    }

    /// One page of books in insertion order
    pub fn list_all(&self, page: PageRequest) -> Result<Vec<Book>> {
        let (limit, offset) = limit_offset(page)?;
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ?1 OFFSET ?2");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(StoreError::query("prepare book listing"))?;
        let books = stmt
            .query_map(params![limit, offset], row_to_book)
            .map_err(StoreError::query("list books"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::query("read book row"))?;

        Ok(books)
    }

    /// Page of books whose cleaned title contains `filter`, ignoring case
    pub fn find_by_cleaned_title(&self, page: PageRequest, filter: &str) -> Result<Vec<Book>> {
        self.find_filtered(FilterColumn::CleanedTitle, page, filter)
    }

    /// Page of books whose name contains `filter`, ignoring case
    pub fn find_by_book_name(&self, page: PageRequest, filter: &str) -> Result<Vec<Book>> {
        self.find_filtered(FilterColumn::BookName, page, filter)
    }

    fn find_filtered(
        &self,
        column: FilterColumn,
        page: PageRequest,
        filter: &str,
    ) -> Result<Vec<Book>> {
        let (limit, offset) = limit_offset(page)?;
        // Fold both sides in SQL so they go through the same lower()
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE lower({}) LIKE '%' || lower(?1) || '%' \
             ORDER BY id LIMIT ?2 OFFSET ?3",
            column.sql_name()
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(StoreError::query("prepare filtered listing"))?;
        let books = stmt
            .query_map(params![filter, limit, offset], row_to_book)
            .map_err(StoreError::query("filter books"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::query("read book row"))?;

        debug!(
            "Filter {:?} on {} matched {} books",
            filter,
            column.sql_name(),
            books.len()
        );
        Ok(books)
    }

    /// Every distinct book name, in whatever order SQLite returns them
    pub fn list_unique_book_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT bookName FROM books")
            .map_err(StoreError::query("prepare name listing"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(StoreError::query("list book names"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::query("read book name"))?;

        Ok(names.into_iter().map(Option::unwrap_or_default).collect())
    }

    /// Look up a single book
    pub fn get(&self, id: i64) -> Result<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], row_to_book)
            .optional()
            .map_err(StoreError::query("get book"))
    }

    /// Total number of stored books
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(StoreError::query("count books"))
    }
}
