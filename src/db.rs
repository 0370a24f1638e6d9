mod schema;

pub use schema::Database;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// User account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: i64,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// Reading status code as stored in `book_read_link.read_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Not started.
    Unread,
    /// Marked as read.
    Finished,
    /// Currently being read.
    InProgress,
}

impl ReadStatus {
    /// Stored integer code.
    pub fn code(self) -> i64 {
        match self {
            ReadStatus::Unread => 0,
            ReadStatus::Finished => 1,
            ReadStatus::InProgress => 2,
        }
    }

    /// Look up a status by stored code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ReadStatus::Unread),
            1 => Some(ReadStatus::Finished),
            2 => Some(ReadStatus::InProgress),
            _ => None,
        }
    }
}

/// Per-user reading state for a book.
#[derive(Debug, Clone)]
pub struct ReadBook {
    /// Calibre book ID.
    pub book_id: i64,
    /// Owner user ID.
    pub user_id: i64,
    /// Raw status code (see [`ReadStatus`]).
    pub read_status: i64,
    /// Last modification of this state.
    pub last_modified: Option<DateTime<Utc>>,
    /// When the user last started reading.
    pub last_time_started_reading: Option<DateTime<Utc>>,
    /// How many times reading was started.
    pub times_started_reading: i64,
    /// Kobo sync state, if the book was ever synced to a device.
    pub kobo_reading_state: Option<KoboReadingState>,
}

/// Kobo device reading state attached to a [`ReadBook`].
#[derive(Debug, Clone)]
pub struct KoboReadingState {
    /// Current position.
    pub current_bookmark: Option<KoboBookmark>,
    /// Reading time statistics.
    pub statistics: Option<KoboStatistics>,
}

/// Reading position reported by a Kobo device.
#[derive(Debug, Clone)]
pub struct KoboBookmark {
    /// Overall progress (0-100).
    pub progress_percent: Option<f64>,
    /// Progress within the current content source.
    pub content_source_progress_percent: Option<f64>,
    /// Opaque location value.
    pub location_value: Option<String>,
    /// Location kind (e.g. "KoboSpan").
    pub location_type: Option<String>,
    /// Content file the location refers to.
    pub location_source: Option<String>,
    /// Last update.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Reading time statistics reported by a Kobo device.
#[derive(Debug, Clone)]
pub struct KoboStatistics {
    /// Estimated minutes left.
    pub remaining_time_minutes: Option<i64>,
    /// Minutes spent reading.
    pub spent_reading_minutes: Option<i64>,
    /// Last update.
    pub last_modified: Option<DateTime<Utc>>,
}

/// User-placed bookmark in a book format.
#[derive(Debug, Clone)]
pub struct Bookmark {
    /// Bookmark ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Calibre book ID.
    pub book_id: i64,
    /// Book format the bookmark belongs to.
    pub format: String,
    /// Reader-specific position key.
    pub bookmark_key: String,
}

/// Aggregated reading figures over all of a user's reading states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingSummary {
    /// Number of reading states.
    pub tracked: i64,
    /// States marked finished.
    pub finished: i64,
    /// States in progress.
    pub in_progress: i64,
    /// States marked unread.
    pub unread: i64,
    /// Sum of spent reading minutes.
    pub reading_minutes: i64,
    /// Sum of remaining minutes.
    pub remaining_minutes: i64,
    /// States that carry a statistics record.
    pub with_statistics: i64,
}

/// Get current Unix timestamp.
pub fn now_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339, SQLite/Calibre text timestamps with an offset
/// (`2024-01-02 10:00:00.123+00:00`) and naive timestamps, which are
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parse_calibre_timestamp() {
        let dt = parse_timestamp("2023-04-05 06:07:08.123456+00:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 4, 5));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (6, 7, 8));
    }

    #[test]
    fn parse_naive_timestamp_as_utc() {
        let dt = parse_timestamp("2023-04-05 06:07:08").unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-04-05T06:07:08+00:00");
    }

    #[test]
    fn parse_offset_is_normalized() {
        let dt = parse_timestamp("2023-04-05T08:07:08+02:00").unwrap();
        assert_eq!(dt.hour(), 6);
    }

    #[test]
    fn parse_garbage_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn read_status_codes() {
        for status in [ReadStatus::Unread, ReadStatus::Finished, ReadStatus::InProgress] {
            assert_eq!(ReadStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(ReadStatus::from_code(7), None);
    }
}
