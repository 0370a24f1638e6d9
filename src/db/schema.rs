use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Arc;

/// Columns selected for a reading state joined with its Kobo records.
const READING_STATE_SELECT: &str = "
    SELECT r.book_id, r.user_id, r.read_status, r.last_modified,
           r.last_time_started_reading, r.times_started_reading,
           k.id,
           b.id, b.progress_percent, b.content_source_progress_percent,
           b.location_value, b.location_type, b.location_source, b.last_modified,
           s.id, s.remaining_time_minutes, s.spent_reading_minutes, s.last_modified
    FROM book_read_link r
    LEFT JOIN kobo_reading_state k ON k.user_id = r.user_id AND k.book_id = r.book_id
    LEFT JOIN kobo_bookmark b ON b.kobo_reading_state_id = k.id
    LEFT JOIN kobo_statistics s ON s.kobo_reading_state_id = k.id";

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_login INTEGER
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Per-user reading status
            CREATE TABLE IF NOT EXISTS book_read_link (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                read_status INTEGER NOT NULL DEFAULT 0,
                last_modified TEXT,
                last_time_started_reading TEXT,
                times_started_reading INTEGER NOT NULL DEFAULT 0,
                UNIQUE (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Kobo device reading state
            CREATE TABLE IF NOT EXISTS kobo_reading_state (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                book_id INTEGER NOT NULL,
                last_modified TEXT,
                priority_timestamp TEXT,
                UNIQUE (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Kobo current position
            CREATE TABLE IF NOT EXISTS kobo_bookmark (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kobo_reading_state_id INTEGER NOT NULL UNIQUE,
                last_modified TEXT,
                location_source TEXT,
                location_type TEXT,
                location_value TEXT,
                progress_percent REAL,
                content_source_progress_percent REAL,
                FOREIGN KEY (kobo_reading_state_id) REFERENCES kobo_reading_state(id) ON DELETE CASCADE
            );

            -- Kobo reading time statistics
            CREATE TABLE IF NOT EXISTS kobo_statistics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kobo_reading_state_id INTEGER NOT NULL UNIQUE,
                last_modified TEXT,
                remaining_time_minutes INTEGER,
                spent_reading_minutes INTEGER,
                FOREIGN KEY (kobo_reading_state_id) REFERENCES kobo_reading_state(id) ON DELETE CASCADE
            );

            -- User bookmarks
            CREATE TABLE IF NOT EXISTS bookmark (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                book_id INTEGER NOT NULL,
                format TEXT NOT NULL,
                bookmark_key TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_read_link_user_status ON book_read_link(user_id, read_status);
            CREATE INDEX IF NOT EXISTS idx_bookmark_user_book ON bookmark(user_id, book_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run raw SQL against the store (fixtures).
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| AppError::Internal(format!("Failed to execute batch: {}", e)))
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user and return it with its assigned ID.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn.lock();
        let created_at = now_timestamp();
        conn.execute(
            "INSERT INTO users (username, password_hash, created_at, last_login)
             VALUES (?1, ?2, ?3, NULL)",
            params![username, password_hash, created_at],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::InvalidRequest(format!("Username '{}' already exists", username))
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
            last_login: None,
        })
    }

    /// Get user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, created_at, last_login
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, created_at, last_login
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, username, password_hash, created_at, last_login
                 FROM users ORDER BY username",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Update user password.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![password_hash, username],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Delete user.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.token, session.user_id, session.expires_at],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Internal(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== READING STATE OPERATIONS ==========

    /// Get a user's reading state for a book.
    pub fn get_reading_state(&self, user_id: i64, book_id: i64) -> Result<Option<ReadBook>> {
        let conn = self.conn.lock();
        let sql = format!(
            "{READING_STATE_SELECT} WHERE r.user_id = ?1 AND r.book_id = ?2 LIMIT 1"
        );
        conn.query_row(&sql, params![user_id, book_id], row_to_read_book)
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get reading state: {}", e)))
    }

    /// List a user's reading states with the given status, most recently
    /// modified first.
    pub fn list_reading_states(
        &self,
        user_id: i64,
        status: ReadStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReadBook>> {
        let conn = self.conn.lock();
        let sql = format!(
            "{READING_STATE_SELECT}
             WHERE r.user_id = ?1 AND r.read_status = ?2
             ORDER BY r.last_modified DESC, r.id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let states = stmt
            .query_map(
                params![user_id, status.code(), limit, offset],
                row_to_read_book,
            )
            .map_err(|e| AppError::Internal(format!("Failed to list reading states: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect reading states: {}", e)))?;

        Ok(states)
    }

    /// Count a user's reading states with the given status.
    pub fn count_reading_states(&self, user_id: i64, status: ReadStatus) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM book_read_link WHERE user_id = ?1 AND read_status = ?2",
            params![user_id, status.code()],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Internal(format!("Failed to count reading states: {}", e)))
    }

    /// Aggregate all of a user's reading states.
    pub fn reading_summary(&self, user_id: i64) -> Result<ReadingSummary> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN r.read_status = ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN r.read_status = ?3 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN r.read_status = ?4 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(s.spent_reading_minutes), 0),
                    COALESCE(SUM(s.remaining_time_minutes), 0),
                    COUNT(s.id)
             FROM book_read_link r
             LEFT JOIN kobo_reading_state k ON k.user_id = r.user_id AND k.book_id = r.book_id
             LEFT JOIN kobo_statistics s ON s.kobo_reading_state_id = k.id
             WHERE r.user_id = ?1",
            params![
                user_id,
                ReadStatus::Finished.code(),
                ReadStatus::InProgress.code(),
                ReadStatus::Unread.code(),
            ],
            |row| {
                Ok(ReadingSummary {
                    tracked: row.get(0)?,
                    finished: row.get(1)?,
                    in_progress: row.get(2)?,
                    unread: row.get(3)?,
                    reading_minutes: row.get(4)?,
                    remaining_minutes: row.get(5)?,
                    with_statistics: row.get(6)?,
                })
            },
        )
        .map_err(|e| AppError::Internal(format!("Failed to summarize reading states: {}", e)))
    }

    // ========== BOOKMARK OPERATIONS ==========

    /// Get a user's bookmarks for a book.
    pub fn get_bookmarks(&self, user_id: i64, book_id: i64) -> Result<Vec<Bookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, book_id, format, bookmark_key
                 FROM bookmark WHERE user_id = ?1 AND book_id = ?2
                 ORDER BY id",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let bookmarks = stmt
            .query_map(params![user_id, book_id], row_to_bookmark)
            .map_err(|e| AppError::Internal(format!("Failed to get bookmarks: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect bookmarks: {}", e)))?;

        Ok(bookmarks)
    }

    /// Get all of a user's bookmarks across books.
    pub fn get_user_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, book_id, format, bookmark_key
                 FROM bookmark WHERE user_id = ?1
                 ORDER BY id",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let bookmarks = stmt
            .query_map(params![user_id], row_to_bookmark)
            .map_err(|e| AppError::Internal(format!("Failed to get bookmarks: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect bookmarks: {}", e)))?;

        Ok(bookmarks)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
        last_login: row.get(4)?,
    })
}

fn row_to_bookmark(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get(0)?,
        user_id: row.get(1)?,
        book_id: row.get(2)?,
        format: row.get(3)?,
        bookmark_key: row.get(4)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<chrono::DateTime<chrono::Utc>>> {
    let value: Option<String> = row.get(idx)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

/// Map a [`READING_STATE_SELECT`] row.
fn row_to_read_book(row: &Row<'_>) -> rusqlite::Result<ReadBook> {
    let kobo_id: Option<i64> = row.get(6)?;
    let bookmark_id: Option<i64> = row.get(7)?;
    let statistics_id: Option<i64> = row.get(14)?;

    let kobo_reading_state = match kobo_id {
        Some(_) => {
            let current_bookmark = match bookmark_id {
                Some(_) => Some(KoboBookmark {
                    progress_percent: row.get(8)?,
                    content_source_progress_percent: row.get(9)?,
                    location_value: row.get(10)?,
                    location_type: row.get(11)?,
                    location_source: row.get(12)?,
                    last_modified: timestamp_column(row, 13)?,
                }),
                None => None,
            };
            let statistics = match statistics_id {
                Some(_) => Some(KoboStatistics {
                    remaining_time_minutes: row.get(15)?,
                    spent_reading_minutes: row.get(16)?,
                    last_modified: timestamp_column(row, 17)?,
                }),
                None => None,
            };
            Some(KoboReadingState {
                current_bookmark,
                statistics,
            })
        }
        None => None,
    };

    Ok(ReadBook {
        book_id: row.get(0)?,
        user_id: row.get(1)?,
        read_status: row.get(2)?,
        last_modified: timestamp_column(row, 3)?,
        last_time_started_reading: timestamp_column(row, 4)?,
        times_started_reading: row.get(5)?,
        kobo_reading_state,
    })
}
