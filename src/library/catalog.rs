//! Read-only access to a Calibre `metadata.db`.

use crate::db::parse_timestamp;
use crate::error::{AppError, Result};
use crate::library::book::*;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Arc;

const BOOK_COLUMNS: &str =
    "id, title, sort, timestamp, pubdate, path, has_cover, uuid, isbn, series_index";

/// Calibre catalog handle.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Open an existing Calibre database read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            AppError::Internal(format!(
                "Failed to open catalog {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an empty in-memory catalog with the Calibre schema (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open catalog: {}", e)))?;

        conn.execute_batch(CALIBRE_SCHEMA)
            .map_err(|e| AppError::Internal(format!("Failed to initialize catalog: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run raw SQL against the catalog (fixtures).
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| AppError::Internal(format!("Failed to execute batch: {}", e)))
    }

    /// Get a book by ID.
    pub fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_book)
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// Get a book together with its related records.
    pub fn get_book_with_metadata(&self, id: i64) -> Result<Option<(Book, BookMetadata)>> {
        let Some(book) = self.get_book(id)? else {
            return Ok(None);
        };
        let metadata = self.get_metadata(id)?;
        Ok(Some((book, metadata)))
    }

    /// Get the title of a book, if it exists.
    pub fn get_book_title(&self, id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT title FROM books WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book title: {}", e)))
    }

    /// List books in the requested order.
    pub fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let direction = query.order.keyword();
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books
             ORDER BY {column} {direction}, id {direction}
             LIMIT ?1 OFFSET ?2",
            column = query.sort.column(),
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![query.limit, query.offset], row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Count all books.
    pub fn count_books(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(|e| AppError::Internal(format!("Failed to count books: {}", e)))
    }

    /// Load authors, tags, series, ratings, languages, publishers,
    /// comments and formats of a book.
    pub fn get_metadata(&self, book_id: i64) -> Result<BookMetadata> {
        let conn = self.conn.lock();

        let authors = query_list(
            &conn,
            "SELECT a.id, a.name, a.sort FROM authors a
             JOIN books_authors_link l ON l.author = a.id
             WHERE l.book = ?1 ORDER BY l.id",
            book_id,
            |row| {
                Ok(Author {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sort: row.get(2)?,
                })
            },
        )?;

        let tags = query_list(
            &conn,
            "SELECT t.id, t.name FROM tags t
             JOIN books_tags_link l ON l.tag = t.id
             WHERE l.book = ?1 ORDER BY l.id",
            book_id,
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?;

        let series = query_list(
            &conn,
            "SELECT s.id, s.name FROM series s
             JOIN books_series_link l ON l.series = s.id
             WHERE l.book = ?1 ORDER BY l.id",
            book_id,
            |row| {
                Ok(Series {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?
        .into_iter()
        .next();

        let ratings = query_list(
            &conn,
            "SELECT r.id, r.rating FROM ratings r
             JOIN books_ratings_link l ON l.rating = r.id
             WHERE l.book = ?1 ORDER BY l.id",
            book_id,
            |row| {
                Ok(Rating {
                    id: row.get(0)?,
                    rating: row.get(1)?,
                })
            },
        )?;

        let languages = query_list(
            &conn,
            "SELECT g.id, g.lang_code FROM languages g
             JOIN books_languages_link l ON l.lang_code = g.id
             WHERE l.book = ?1 ORDER BY l.item_order, l.id",
            book_id,
            |row| {
                Ok(Language {
                    id: row.get(0)?,
                    lang_code: row.get(1)?,
                })
            },
        )?;

        let publishers = query_list(
            &conn,
            "SELECT p.id, p.name FROM publishers p
             JOIN books_publishers_link l ON l.publisher = p.id
             WHERE l.book = ?1 ORDER BY l.id",
            book_id,
            |row| {
                Ok(Publisher {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?;

        let comments = conn
            .query_row(
                "SELECT text FROM comments WHERE book = ?1 ORDER BY id LIMIT 1",
                params![book_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get comments: {}", e)))?
            .flatten();

        let formats = query_list(
            &conn,
            "SELECT id, format, uncompressed_size FROM data WHERE book = ?1 ORDER BY id",
            book_id,
            |row| {
                Ok(DataFile {
                    id: row.get(0)?,
                    format: row.get(1)?,
                    uncompressed_size: row.get(2)?,
                })
            },
        )?;

        Ok(BookMetadata {
            authors,
            tags,
            series,
            ratings,
            languages,
            publishers,
            comments,
            formats,
        })
    }
}

fn query_list<T>(
    conn: &Connection,
    sql: &str,
    book_id: i64,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

    stmt.query_map(params![book_id], map)
        .map_err(|e| AppError::Internal(format!("Failed to load book metadata: {}", e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(format!("Failed to collect book metadata: {}", e)))
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    let timestamp: Option<String> = row.get(3)?;
    let pubdate: Option<String> = row.get(4)?;
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        sort: row.get(2)?,
        timestamp: timestamp.as_deref().and_then(parse_timestamp),
        pubdate: pubdate.as_deref().and_then(parse_timestamp),
        path: row.get(5)?,
        has_cover: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
        uuid: row.get(7)?,
        isbn: row.get(8)?,
        series_index: row.get::<_, Option<f64>>(9)?.unwrap_or(1.0),
    })
}

/// The subset of Calibre's schema read by [`Catalog`].
const CALIBRE_SCHEMA: &str = r#"
    CREATE TABLE books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT 'Unknown',
        sort TEXT,
        timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        pubdate TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        series_index REAL NOT NULL DEFAULT 1.0,
        author_sort TEXT,
        isbn TEXT DEFAULT '',
        lccn TEXT DEFAULT '',
        path TEXT NOT NULL DEFAULT '',
        flags INTEGER NOT NULL DEFAULT 1,
        uuid TEXT,
        has_cover BOOL DEFAULT 0,
        last_modified TIMESTAMP NOT NULL DEFAULT '2000-01-01 00:00:00+00:00'
    );
    CREATE TABLE authors (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        sort TEXT,
        link TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE books_authors_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        author INTEGER NOT NULL,
        UNIQUE (book, author)
    );
    CREATE TABLE tags (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE books_tags_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        UNIQUE (book, tag)
    );
    CREATE TABLE series (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        sort TEXT
    );
    CREATE TABLE books_series_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        series INTEGER NOT NULL,
        UNIQUE (book)
    );
    CREATE TABLE ratings (
        id INTEGER PRIMARY KEY,
        rating INTEGER CHECK (rating > -1 AND rating < 11),
        UNIQUE (rating)
    );
    CREATE TABLE books_ratings_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        rating INTEGER NOT NULL,
        UNIQUE (book, rating)
    );
    CREATE TABLE languages (
        id INTEGER PRIMARY KEY,
        lang_code TEXT NOT NULL UNIQUE
    );
    CREATE TABLE books_languages_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        lang_code INTEGER NOT NULL,
        item_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE (book, lang_code)
    );
    CREATE TABLE publishers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        sort TEXT
    );
    CREATE TABLE books_publishers_link (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        publisher INTEGER NOT NULL,
        UNIQUE (book)
    );
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        text TEXT NOT NULL,
        UNIQUE (book)
    );
    CREATE TABLE data (
        id INTEGER PRIMARY KEY,
        book INTEGER NOT NULL,
        format TEXT NOT NULL,
        uncompressed_size INTEGER NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (book, format)
    );
"#;
