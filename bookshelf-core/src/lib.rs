//! Shared types for bookshelf
//!
//! This crate contains the plain data types exchanged between the store
//! and its callers. It does not depend on SQLite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Stored book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub book_name: String,
    pub cleaned_title: String,
    pub url: String,
    /// Set by the store when the row is created
    pub added: Option<DateTime<Utc>>,
    /// `None` until the first update
    pub edited: Option<DateTime<Utc>>,
}

/// Fields a caller supplies on insert or update.
///
/// `id`, `added` and `edited` are owned by the store and cannot be set here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub book_name: String,
    pub cleaned_title: String,
    pub url: String,
}

impl NewBook {
    pub fn new(
        book_name: impl Into<String>,
        cleaned_title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            book_name: book_name.into(),
            cleaned_title: cleaned_title.into(),
            url: url.into(),
        }
    }
}

impl From<&Book> for NewBook {
    fn from(book: &Book) -> Self {
        Self {
            book_name: book.book_name.clone(),
            cleaned_title: book.cleaned_title.clone(),
            url: book.url.clone(),
        }
    }
}

/// 1-based page window for listing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// First page with the given size
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// The page after this one
    pub fn next(self) -> Self {
        Self::new(self.page.saturating_add(1), self.page_size)
    }

    /// Both values must be at least 1
    pub fn is_valid(&self) -> bool {
        self.page >= 1 && self.page_size >= 1
    }

    /// Row offset `(page - 1) * page_size`, or `None` for an invalid page
    pub fn offset(&self) -> Option<u64> {
        if !self.is_valid() {
            return None;
        }
        u64::from(self.page - 1).checked_mul(u64::from(self.page_size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_starts_at_zero_for_first_page() {
        assert_eq!(PageRequest::new(1, 50).offset(), Some(0));
        assert_eq!(PageRequest::new(3, 10).offset(), Some(20));
    }

    #[test]
    fn zero_page_or_size_has_no_offset() {
        assert_eq!(PageRequest::new(0, 10).offset(), None);
        assert_eq!(PageRequest::new(1, 0).offset(), None);
        assert!(!PageRequest::new(0, 0).is_valid());
    }

    #[test]
    fn large_pages_do_not_overflow() {
        let page = PageRequest::new(u32::MAX, u32::MAX);
        let expected = u64::from(u32::MAX - 1) * u64::from(u32::MAX);
        assert_eq!(page.offset(), Some(expected));
    }

    #[test]
    fn next_advances_page_only() {
        let page = PageRequest::first(7).next();
        assert_eq!(page, PageRequest::new(2, 7));
    }

    #[test]
    fn new_book_serializes_with_snake_case_fields() {
        let book = NewBook::new("name", "title", "https://example.com/a");
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["book_name"], "name");
        assert_eq!(json["cleaned_title"], "title");
        assert_eq!(json["url"], "https://example.com/a");
    }
}
