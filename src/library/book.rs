//! Calibre catalog models.

use chrono::{DateTime, Utc};

/// A row of Calibre's `books` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    /// Calibre book ID.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Title sort key.
    pub sort: Option<String>,
    /// When the book was added to the library.
    pub timestamp: Option<DateTime<Utc>>,
    /// Publication date.
    pub pubdate: Option<DateTime<Utc>>,
    /// Directory of the book relative to the library root.
    pub path: String,
    /// Whether a cover image is available.
    pub has_cover: bool,
    /// Calibre UUID.
    pub uuid: Option<String>,
    /// ISBN.
    pub isbn: Option<String>,
    /// Position in series.
    pub series_index: f64,
}

/// Related records of a book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMetadata {
    /// Authors in link order.
    pub authors: Vec<Author>,
    /// Tags.
    pub tags: Vec<Tag>,
    /// First linked series.
    pub series: Option<Series>,
    /// Ratings.
    pub ratings: Vec<Rating>,
    /// Languages in item order.
    pub languages: Vec<Language>,
    /// Publishers.
    pub publishers: Vec<Publisher>,
    /// Description text.
    pub comments: Option<String>,
    /// Available file formats.
    pub formats: Vec<DataFile>,
}

/// Book author.
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub sort: Option<String>,
}

/// Tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: i64,
    pub name: String,
}

/// Rating (0-10 scale).
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub id: i64,
    pub rating: Option<i64>,
}

/// Language.
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    pub id: i64,
    pub lang_code: String,
}

/// Publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
}

/// A stored file of a book (row of `data`).
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    pub id: i64,
    /// Format name, e.g. "EPUB".
    pub format: String,
    pub uncompressed_size: i64,
}

/// Sortable `books` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    Title,
    Sort,
    #[default]
    Timestamp,
    Pubdate,
    SeriesIndex,
    AuthorSort,
    Isbn,
    Path,
    Uuid,
    HasCover,
    LastModified,
}

impl SortField {
    /// Resolve a query parameter, falling back to [`SortField::Timestamp`].
    pub fn from_param(name: &str) -> Self {
        match name {
            "id" => SortField::Id,
            "title" => SortField::Title,
            "sort" => SortField::Sort,
            "timestamp" => SortField::Timestamp,
            "pubdate" => SortField::Pubdate,
            "series_index" => SortField::SeriesIndex,
            "author_sort" => SortField::AuthorSort,
            "isbn" => SortField::Isbn,
            "path" => SortField::Path,
            "uuid" => SortField::Uuid,
            "has_cover" => SortField::HasCover,
            "last_modified" => SortField::LastModified,
            _ => SortField::default(),
        }
    }

    /// Column name in `books`.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Sort => "sort",
            SortField::Timestamp => "timestamp",
            SortField::Pubdate => "pubdate",
            SortField::SeriesIndex => "series_index",
            SortField::AuthorSort => "author_sort",
            SortField::Isbn => "isbn",
            SortField::Path => "path",
            SortField::Uuid => "uuid",
            SortField::HasCover => "has_cover",
            SortField::LastModified => "last_modified",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Only the exact value `desc` selects descending; any other value
    /// given is ascending. An absent parameter keeps the default.
    pub fn from_param(value: &str) -> Self {
        if value == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    /// SQL keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters of a catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookQuery {
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}
