//! JSON representations of catalog and reading-state records.

use crate::db::{Bookmark, KoboBookmark, KoboStatistics, ReadBook, ReadStatus};
use crate::library::book::{Book, BookMetadata};
use crate::pagination::Pagination;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Basic book fields.
#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub sort: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub pubdate: Option<DateTime<Utc>>,
    pub path: String,
    pub has_cover: bool,
    pub uuid: Option<String>,
    pub isbn: Option<String>,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            sort: book.sort.clone(),
            timestamp: book.timestamp,
            pubdate: book.pubdate,
            path: book.path.clone(),
            has_cover: book.has_cover,
            uuid: book.uuid.clone(),
            isbn: book.isbn.clone(),
        }
    }
}

/// Basic fields plus all related metadata.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub summary: BookSummary,
    pub authors: Vec<AuthorView>,
    pub tags: Vec<NamedView>,
    pub series: Option<SeriesView>,
    pub ratings: Vec<RatingView>,
    pub languages: Vec<LanguageView>,
    pub publishers: Vec<NamedView>,
    pub comments: Option<String>,
    pub formats: Vec<FormatView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub name: String,
    pub sort: Option<String>,
}

/// `{id, name}` pair used for tags and publishers.
#[derive(Debug, Clone, Serialize)]
pub struct NamedView {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesView {
    pub id: i64,
    pub name: String,
    pub index: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingView {
    pub id: i64,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageView {
    pub id: i64,
    pub lang_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormatView {
    pub id: i64,
    pub format: String,
    pub uncompressed_size: i64,
}

/// Serialize a book with its metadata.
pub fn book_detail(book: &Book, metadata: &BookMetadata) -> BookDetail {
    BookDetail {
        summary: BookSummary::from(book),
        authors: metadata
            .authors
            .iter()
            .map(|a| AuthorView {
                id: a.id,
                name: a.name.clone(),
                sort: a.sort.clone(),
            })
            .collect(),
        tags: metadata
            .tags
            .iter()
            .map(|t| NamedView {
                id: t.id,
                name: t.name.clone(),
            })
            .collect(),
        series: metadata.series.as_ref().map(|s| SeriesView {
            id: s.id,
            name: s.name.clone(),
            index: book.series_index,
        }),
        ratings: metadata
            .ratings
            .iter()
            .map(|r| RatingView {
                id: r.id,
                rating: r.rating,
            })
            .collect(),
        languages: metadata
            .languages
            .iter()
            .map(|l| LanguageView {
                id: l.id,
                lang_code: l.lang_code.clone(),
            })
            .collect(),
        publishers: metadata
            .publishers
            .iter()
            .map(|p| NamedView {
                id: p.id,
                name: p.name.clone(),
            })
            .collect(),
        comments: metadata.comments.clone(),
        formats: metadata
            .formats
            .iter()
            .map(|d| FormatView {
                id: d.id,
                format: d.format.clone(),
                uncompressed_size: d.uncompressed_size,
            })
            .collect(),
    }
}

/// Detailed book with the caller's reading state (`null` when absent).
#[derive(Debug, Clone, Serialize)]
pub struct BookWithState {
    #[serde(flatten)]
    pub book: BookDetail,
    pub reading_state: Option<ReadingStateView>,
}

/// Reading position of a book.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub progress_percent: Option<f64>,
    pub content_source_progress_percent: Option<f64>,
    pub location_value: Option<String>,
    pub location_type: Option<String>,
    pub location_source: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&KoboBookmark> for ProgressView {
    fn from(bookmark: &KoboBookmark) -> Self {
        Self {
            progress_percent: bookmark.progress_percent,
            content_source_progress_percent: bookmark.content_source_progress_percent,
            location_value: bookmark.location_value.clone(),
            location_type: bookmark.location_type.clone(),
            location_source: bookmark.location_source.clone(),
            last_modified: bookmark.last_modified,
        }
    }
}

/// Reading time as embedded in a reading state.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub remaining_time_minutes: Option<i64>,
    pub spent_reading_minutes: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&KoboStatistics> for StatisticsView {
    fn from(stats: &KoboStatistics) -> Self {
        Self {
            remaining_time_minutes: stats.remaining_time_minutes,
            spent_reading_minutes: stats.spent_reading_minutes,
            last_modified: stats.last_modified,
        }
    }
}

/// Reading status with nested progress and statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingStateView {
    pub book_id: i64,
    pub user_id: i64,
    pub read_status: i64,
    pub read_status_name: &'static str,
    pub last_modified: Option<DateTime<Utc>>,
    pub last_time_started_reading: Option<DateTime<Utc>>,
    pub times_started_reading: i64,
    pub progress: Option<ProgressView>,
    pub statistics: Option<StatisticsView>,
}

impl From<&ReadBook> for ReadingStateView {
    fn from(state: &ReadBook) -> Self {
        let kobo = state.kobo_reading_state.as_ref();
        Self {
            book_id: state.book_id,
            user_id: state.user_id,
            read_status: state.read_status,
            read_status_name: read_status_name(state.read_status),
            last_modified: state.last_modified,
            last_time_started_reading: state.last_time_started_reading,
            times_started_reading: state.times_started_reading,
            progress: kobo
                .and_then(|k| k.current_bookmark.as_ref())
                .map(ProgressView::from),
            statistics: kobo
                .and_then(|k| k.statistics.as_ref())
                .map(StatisticsView::from),
        }
    }
}

/// Human-readable name of a stored status code.
pub fn read_status_name(code: i64) -> &'static str {
    match ReadStatus::from_code(code) {
        Some(ReadStatus::Unread) => "unread",
        Some(ReadStatus::Finished) => "finished",
        Some(ReadStatus::InProgress) => "in_progress",
        None => "unknown",
    }
}

/// Minutes to hours, rounded to two decimals.
pub fn minutes_to_hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

/// Response of `/books/{id}/progress`.
#[derive(Debug, Clone, Serialize)]
pub struct BookProgress {
    pub book_id: i64,
    #[serde(flatten)]
    pub progress: ProgressView,
}

/// Response of `/books/{id}/statistics`.
#[derive(Debug, Clone, Serialize)]
pub struct BookStatistics {
    pub book_id: i64,
    pub remaining_time_minutes: Option<i64>,
    pub spent_reading_minutes: Option<i64>,
    pub remaining_time_hours: Option<f64>,
    pub spent_reading_hours: Option<f64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl BookStatistics {
    pub fn new(book_id: i64, stats: &KoboStatistics) -> Self {
        Self {
            book_id,
            remaining_time_minutes: stats.remaining_time_minutes,
            spent_reading_minutes: stats.spent_reading_minutes,
            remaining_time_hours: stats.remaining_time_minutes.map(minutes_to_hours),
            spent_reading_hours: stats.spent_reading_minutes.map(minutes_to_hours),
            last_modified: stats.last_modified,
        }
    }
}

/// Response of `/statistics/summary`.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSummary {
    pub total_books_tracked: i64,
    pub books_finished: i64,
    pub books_in_progress: i64,
    pub books_unread: i64,
    pub total_reading_minutes: i64,
    pub total_reading_hours: f64,
    pub total_remaining_minutes: i64,
    pub total_remaining_hours: f64,
    pub books_with_statistics: i64,
}

impl From<&crate::db::ReadingSummary> for StatisticsSummary {
    fn from(summary: &crate::db::ReadingSummary) -> Self {
        Self {
            total_books_tracked: summary.tracked,
            books_finished: summary.finished,
            books_in_progress: summary.in_progress,
            books_unread: summary.unread,
            total_reading_minutes: summary.reading_minutes,
            total_reading_hours: minutes_to_hours(summary.reading_minutes),
            total_remaining_minutes: summary.remaining_minutes,
            total_remaining_hours: minutes_to_hours(summary.remaining_minutes),
            books_with_statistics: summary.with_statistics,
        }
    }
}

/// Bookmark as listed for a single book.
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkView {
    pub id: i64,
    pub book_id: i64,
    pub format: String,
    pub bookmark_key: String,
}

impl From<&Bookmark> for BookmarkView {
    fn from(bookmark: &Bookmark) -> Self {
        Self {
            id: bookmark.id,
            book_id: bookmark.book_id,
            format: bookmark.format.clone(),
            bookmark_key: bookmark.bookmark_key.clone(),
        }
    }
}

/// Bookmark annotated with its book's title.
#[derive(Debug, Clone, Serialize)]
pub struct TitledBookmarkView {
    pub id: i64,
    pub book_id: i64,
    pub book_title: String,
    pub format: String,
    pub bookmark_key: String,
}

impl TitledBookmarkView {
    /// A missing book is shown as "Unknown".
    pub fn new(bookmark: &Bookmark, title: Option<String>) -> Self {
        Self {
            id: bookmark.id,
            book_id: bookmark.book_id,
            book_title: title.unwrap_or_else(|| "Unknown".to_string()),
            format: bookmark.format.clone(),
            bookmark_key: bookmark.bookmark_key.clone(),
        }
    }
}

/// Response of `/books/{id}/bookmarks`.
#[derive(Debug, Clone, Serialize)]
pub struct BookBookmarks {
    pub book_id: i64,
    pub bookmarks: Vec<BookmarkView>,
    pub count: usize,
}

/// Response of `/bookmarks`.
#[derive(Debug, Clone, Serialize)]
pub struct UserBookmarks {
    pub bookmarks: Vec<TitledBookmarkView>,
    pub count: usize,
}

/// Paginated list of books.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage<T> {
    pub books: Vec<T>,
    pub pagination: Pagination,
}

/// Response of `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub api_version: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl Health {
    pub fn now() -> Self {
        Self {
            status: "ok",
            api_version: "v2",
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::KoboReadingState;
    use crate::library::book::{Author, Series};
    use serde_json::json;

    fn book() -> Book {
        Book {
            id: 7,
            title: "Dune".to_string(),
            sort: Some("Dune".to_string()),
            timestamp: crate::db::parse_timestamp("2024-03-01 12:00:00+00:00"),
            pubdate: None,
            path: "Frank Herbert/Dune (7)".to_string(),
            has_cover: true,
            uuid: Some("c0ffee".to_string()),
            isbn: Some(String::new()),
            series_index: 1.0,
        }
    }

    #[test]
    fn status_names() {
        assert_eq!(read_status_name(0), "unread");
        assert_eq!(read_status_name(1), "finished");
        assert_eq!(read_status_name(2), "in_progress");
        assert_eq!(read_status_name(3), "unknown");
        assert_eq!(read_status_name(-1), "unknown");
    }

    #[test]
    fn hours_are_rounded() {
        assert_eq!(minutes_to_hours(0), 0.0);
        assert_eq!(minutes_to_hours(60), 1.0);
        assert_eq!(minutes_to_hours(100), 1.67);
        assert_eq!(minutes_to_hours(125), 2.08);
    }

    #[test]
    fn statistics_hours_follow_minutes() {
        let stats = KoboStatistics {
            remaining_time_minutes: None,
            spent_reading_minutes: Some(90),
            last_modified: None,
        };
        let view = BookStatistics::new(3, &stats);
        assert_eq!(view.remaining_time_hours, None);
        assert_eq!(view.spent_reading_hours, Some(1.5));

        let zero = KoboStatistics {
            remaining_time_minutes: Some(0),
            spent_reading_minutes: None,
            last_modified: None,
        };
        assert_eq!(BookStatistics::new(3, &zero).remaining_time_hours, Some(0.0));
    }

    #[test]
    fn summary_serializes_basic_fields() {
        let value = serde_json::to_value(BookSummary::from(&book())).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["timestamp"], json!("2024-03-01T12:00:00Z"));
        assert_eq!(value["pubdate"], json!(null));
        assert!(value.get("authors").is_none());
    }

    #[test]
    fn detail_uses_book_series_index() {
        let mut b = book();
        b.series_index = 2.5;
        let metadata = BookMetadata {
            authors: vec![Author {
                id: 1,
                name: "Frank Herbert".to_string(),
                sort: Some("Herbert, Frank".to_string()),
            }],
            series: Some(Series {
                id: 4,
                name: "Dune Chronicles".to_string(),
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(book_detail(&b, &metadata)).unwrap();
        assert_eq!(value["title"], json!("Dune"));
        assert_eq!(value["series"], json!({"id": 4, "name": "Dune Chronicles", "index": 2.5}));
        assert_eq!(value["authors"][0]["sort"], json!("Herbert, Frank"));
        assert_eq!(value["comments"], json!(null));
        assert_eq!(value["formats"], json!([]));
    }

    #[test]
    fn reading_state_without_kobo_has_null_children() {
        let state = ReadBook {
            book_id: 7,
            user_id: 1,
            read_status: 2,
            last_modified: None,
            last_time_started_reading: None,
            times_started_reading: 1,
            kobo_reading_state: Some(KoboReadingState {
                current_bookmark: None,
                statistics: None,
            }),
        };
        let value = serde_json::to_value(ReadingStateView::from(&state)).unwrap();
        assert_eq!(value["read_status_name"], json!("in_progress"));
        assert_eq!(value["progress"], json!(null));
        assert_eq!(value["statistics"], json!(null));
    }

    #[test]
    fn titled_bookmark_defaults_to_unknown() {
        let bookmark = Bookmark {
            id: 1,
            user_id: 1,
            book_id: 404,
            format: "EPUB".to_string(),
            bookmark_key: "epubcfi(/6/4)".to_string(),
        };
        assert_eq!(TitledBookmarkView::new(&bookmark, None).book_title, "Unknown");
        assert_eq!(
            TitledBookmarkView::new(&bookmark, Some("Emma".to_string())).book_title,
            "Emma"
        );
    }
}
