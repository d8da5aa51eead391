//! bookshelf - command-line driver for the book store
//!
//! Opens the configured SQLite database and runs one store operation per
//! invocation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookshelf::config::Config;
use bookshelf::{Book, BookStore, NewBook, PageRequest};

/// bookshelf - SQLite book catalogue
#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(version)]
#[command(about = "SQLite-backed book catalogue", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book
    Insert {
        book_name: String,
        cleaned_title: String,
        url: String,
    },

    /// Replace name, title and url of a book
    Update {
        id: i64,
        book_name: String,
        cleaned_title: String,
        url: String,
    },

    /// Remove a book
    Delete { id: i64 },

    /// List books page by page
    List {
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Rows per page (defaults to the configured page size)
        #[arg(short = 's', long)]
        page_size: Option<u32>,
    },

    /// Find books whose cleaned title contains a string (case-insensitive)
    FindTitle {
        filter: String,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short = 's', long)]
        page_size: Option<u32>,
    },

    /// Find books whose name contains a string (case-insensitive)
    FindName {
        filter: String,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short = 's', long)]
        page_size: Option<u32>,
    },

    /// List distinct book names
    Names,

    /// Run an insert/list/update/delete walkthrough against the database
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());
    let mut store = BookStore::open_with(&db_path, &config.store_options())
        .with_context(|| format!("Failed to open book store at {:?}", db_path))?;

    let page_size = |size: Option<u32>| size.unwrap_or(config.listing.page_size);

    match cli.command {
        Commands::Insert {
            book_name,
            cleaned_title,
            url,
        } => {
            let book = NewBook::new(book_name, cleaned_title, url);
            if let Some(id) = insert_or_skip(&mut store, &book)? {
                println!("Inserted book {}", id);
            }
        }

        Commands::Update {
            id,
            book_name,
            cleaned_title,
            url,
        } => {
            store.update(id, &NewBook::new(book_name, cleaned_title, url))?;
            println!("Updated book {}", id);
        }

        Commands::Delete { id } => {
            store.delete(id)?;
            println!("Deleted book {}", id);
        }

        Commands::List { page, page_size: size } => {
            let books = store.list_all(PageRequest::new(page, page_size(size)))?;
            print_books(&books, cli.json)?;
        }

        Commands::FindTitle {
            filter,
            page,
            page_size: size,
        } => {
            let books =
                store.find_by_cleaned_title(PageRequest::new(page, page_size(size)), &filter)?;
            print_books(&books, cli.json)?;
        }

        Commands::FindName {
            filter,
            page,
            page_size: size,
        } => {
            let books = store.find_by_book_name(PageRequest::new(page, page_size(size)), &filter)?;
            print_books(&books, cli.json)?;
        }

        Commands::Names => {
            let names = store.list_unique_book_names()?;
            if cli.json {
                print_json(&names)?;
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
        }

        Commands::Demo => {
            run_demo(&mut store, page_size(None), cli.json)?;
        }
    }

    store.close()?;
    Ok(())
}

/// Insert a book, treating a duplicate url as a skip rather than a failure
fn insert_or_skip(store: &mut BookStore, book: &NewBook) -> Result<Option<i64>> {
    match store.insert(book) {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.is_unique_violation() => {
            warn!("A book with url {} already exists, skipping", book.url);
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to insert book"),
    }
}

/// Walk through every store operation, printing the table between steps
fn run_demo(store: &mut BookStore, page_size: u32, json: bool) -> Result<()> {
    let page = PageRequest::first(page_size);

    info!("Inserting book...");
    let first = NewBook::new("bookName1", "cleanedTitle1", "url1");
    let first_id = insert_or_skip(store, &first)?;
    print_books(&store.list_all(page)?, json)?;

    // Fall back to the existing row when an earlier run already inserted it
    let target = match first_id {
        Some(id) => Some(id),
        None => store
            .find_by_cleaned_title(page, &first.cleaned_title)?
            .first()
            .map(|book| book.id),
    };

    if let Some(id) = target {
        info!("Updating book {}...", id);
        store.update(
            id,
            &NewBook::new("updatedBookName1", "updatedCleanedTitle1", "updatedUrl1"),
        )?;
        print_books(&store.list_all(page)?, json)?;
    }

    info!("Unique book names:");
    let names = store.list_unique_book_names()?;
    if json {
        print_json(&names)?;
    } else {
        println!("{}", names.join(", "));
    }

    info!("Inserting more data...");
    insert_or_skip(store, &NewBook::new("bookName2", "cleanedTitle2", "url2"))?;

    info!("Books named like \"bookname\":");
    print_books(&store.find_by_book_name(page, "bookname")?, json)?;

    info!("Books titled like \"cleanedtitle2\":");
    print_books(&store.find_by_cleaned_title(page, "cleanedtitle2")?, json)?;

    if let Some(id) = target {
        info!("Deleting book {}...", id);
        store.delete(id)?;
    }
    print_books(&store.list_all(page)?, json)?;

    Ok(())
}

fn print_books(books: &[Book], json: bool) -> Result<()> {
    if json {
        return print_json(books);
    }

    if books.is_empty() {
        println!("(no books)");
        return Ok(());
    }

    for book in books {
        let edited = book
            .edited
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {}  |  {}  |  {}  (edited: {})",
            book.id, book.book_name, book.cleaned_title, book.url, edited
        );
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
