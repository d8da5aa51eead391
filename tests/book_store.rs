use bookshelf::{BookStore, NewBook, PageRequest, StoreError, StoreOptions};
use tempfile::TempDir;

// Helper function to create a store in a fresh temporary directory
fn create_temp_store() -> (BookStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = BookStore::open(dir.path().join("books.db")).unwrap();
    (store, dir)
}

#[test]
fn open_creates_parent_directories_and_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db").join("nested").join("books.db");

    let store = BookStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), Some(path.as_path()));
    assert_eq!(store.count().unwrap(), 0);
    store.close().unwrap();
}

#[test]
fn reopening_keeps_existing_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("books.db");

    let mut store = BookStore::open(&path).unwrap();
    store
        .insert(&NewBook::new("Test Book", "Test Book", "http://test.com"))
        .unwrap();
    store.close().unwrap();

    let store = BookStore::open(&path).unwrap();
    let books = store.list_all(PageRequest::first(50)).unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].url, "http://test.com");
    store.close().unwrap();
}

#[test]
fn open_without_wal_works() {
    let dir = TempDir::new().unwrap();
    let options = StoreOptions {
        wal: false,
        ..StoreOptions::default()
    };
    let mut store = BookStore::open_with(dir.path().join("books.db"), &options).unwrap();
    store.insert(&NewBook::new("a", "b", "c")).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn open_fails_when_parent_is_a_file() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let err = BookStore::open(blocker.join("books.db")).err().unwrap();
    assert!(matches!(err, StoreError::Connection { .. }));
}

#[test]
fn open_fails_on_a_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("books.db");
    std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

    let err = BookStore::open(&path).err().unwrap();
    assert!(matches!(
        err,
        StoreError::Connection { .. } | StoreError::Schema(_)
    ));
}

#[test]
fn duplicate_url_leaves_table_unchanged() {
    let (mut store, _dir) = create_temp_store();
    let book = NewBook::new("Test Book", "Test Book", "http://test.com");

    store.insert(&book).unwrap();
    let err = store.insert(&book).unwrap_err();

    assert!(err.is_unique_violation());
    assert_eq!(err.violated_column(), Some("url"));
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn pages_reconstruct_the_full_table() {
    let (mut store, _dir) = create_temp_store();
    for i in 0..25 {
        store
            .insert(&NewBook::new(
                format!("name{}", i % 4),
                format!("title{i}"),
                format!("https://books.example/{i}"),
            ))
            .unwrap();
    }

    for page_size in [1, 4, 7, 25, 100] {
        let mut page = PageRequest::first(page_size);
        let mut urls = Vec::new();
        loop {
            let books = store.list_all(page).unwrap();
            assert!(books.len() <= page_size as usize);
            if books.is_empty() {
                break;
            }
            urls.extend(books.into_iter().map(|b| b.url));
            page = page.next();
        }

        let expected: Vec<String> = (0..25).map(|i| format!("https://books.example/{i}")).collect();
        assert_eq!(urls, expected, "page_size={page_size}");
    }
}

#[test]
fn filters_and_unique_names() {
    let (mut store, _dir) = create_temp_store();
    store.insert(&NewBook::new("A", "Hello World", "u1")).unwrap();
    store.insert(&NewBook::new("A", "Another Title", "u2")).unwrap();
    store.insert(&NewBook::new("B", "hello again", "u3")).unwrap();

    let page = PageRequest::first(50);
    let hello: Vec<i64> = store
        .find_by_cleaned_title(page, "hello")
        .unwrap()
        .iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(hello, [1, 3]);
    assert!(store.find_by_cleaned_title(page, "xyz").unwrap().is_empty());

    let named_a = store.find_by_book_name(page, "a").unwrap();
    assert_eq!(named_a.len(), 2);

    let mut names = store.list_unique_book_names().unwrap();
    names.sort();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn end_to_end_scenario() {
    let (mut store, _dir) = create_temp_store();
    let page = PageRequest::first(50);

    store
        .insert(&NewBook::new("name1", "title1", "url1"))
        .unwrap();
    let books = store.list_all(page).unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, 1);
    assert!(books[0].edited.is_none());

    store
        .update(1, &NewBook::new("name2", "title2", "url2"))
        .unwrap();
    let books = store.list_all(page).unwrap();
    assert_eq!(books.len(), 1);
    let book = &books[0];
    assert_eq!(
        (book.book_name.as_str(), book.cleaned_title.as_str(), book.url.as_str()),
        ("name2", "title2", "url2")
    );
    let edited = book.edited.expect("edited is stamped by update");
    assert!(edited >= book.added.expect("added is set on insert"));

    store.delete(1).unwrap();
    assert!(store.list_all(page).unwrap().is_empty());

    store.close().unwrap();
}

#[test]
fn writes_on_missing_ids_are_silent() {
    let (mut store, _dir) = create_temp_store();
    store.update(7, &NewBook::new("x", "y", "z")).unwrap();
    store.delete(7).unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn lock_contention_surfaces_as_transaction_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("books.db");
    let mut writer = BookStore::open(&path).unwrap();
    let mut other = BookStore::open(&path).unwrap();

    // Hold the write lock from a raw connection
    let blocker = rusqlite::Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = writer.insert(&NewBook::new("a", "b", "c")).unwrap_err();
    assert!(matches!(err, StoreError::Transaction(_)));
    assert!(!err.is_unique_violation());

    blocker.execute_batch("ROLLBACK").unwrap();
    other.insert(&NewBook::new("a", "b", "c")).unwrap();
    assert_eq!(writer.count().unwrap(), 1);
}
