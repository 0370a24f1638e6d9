//! HTTP request handlers.

use crate::db::{ReadBook, ReadStatus, User};
use crate::error::{AppError, Result, ResultExt};
use crate::library::book::{BookQuery, SortField, SortOrder};
use crate::pagination::PageRequest;
use crate::server::AppState;
use crate::server::extract::{AuthUser, BookId, QueryPairs, bearer_token};
use crate::views::{
    self, BookBookmarks, BookDetail, BookPage, BookProgress, BookStatistics, BookSummary,
    BookWithState, BookmarkView, Health, ProgressView, ReadingStateView, StatisticsSummary,
    TitledBookmarkView, UserBookmarks,
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// BOOK LISTINGS
// ============================================================================

/// All books, basic fields only.
pub async fn list_books(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: QueryPairs,
) -> Result<Json<BookPage<BookSummary>>> {
    let page = params.page_params().resolve();
    let query = BookQuery {
        sort: params
            .first("sort")
            .map(SortField::from_param)
            .unwrap_or_default(),
        order: params
            .first("order")
            .map(SortOrder::from_param)
            .unwrap_or_default(),
        limit: page.per_page(),
        offset: page.offset(),
    };

    tracing::debug!(user = user.id, ?query, "Listing books");

    let total = state.catalog.count_books().context("Failed to retrieve books")?;
    let books = state
        .catalog
        .list_books(&query)
        .context("Failed to retrieve books")?;

    Ok(Json(BookPage {
        books: books.iter().map(BookSummary::from).collect(),
        pagination: page.pagination(total),
    }))
}

/// Books the caller has finished.
pub async fn list_read_books(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: QueryPairs,
) -> Result<Json<BookPage<BookWithState>>> {
    books_with_status(&state, &user, ReadStatus::Finished, params.page_params().resolve())
        .context("Failed to retrieve read books")
        .map(Json)
}

/// Books the caller is currently reading.
pub async fn list_reading_books(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: QueryPairs,
) -> Result<Json<BookPage<BookWithState>>> {
    books_with_status(&state, &user, ReadStatus::InProgress, params.page_params().resolve())
        .context("Failed to retrieve reading books")
        .map(Json)
}

/// Reading states with the given status, joined with catalog details.
/// States whose book has left the catalog are skipped.
fn books_with_status(
    state: &AppState,
    user: &User,
    status: ReadStatus,
    page: PageRequest,
) -> Result<BookPage<BookWithState>> {
    let total = state.db.count_reading_states(user.id, status)?;
    let read_books =
        state
            .db
            .list_reading_states(user.id, status, page.per_page(), page.offset())?;

    let mut books = Vec::with_capacity(read_books.len());
    for read_book in &read_books {
        match detail_with_state(state, read_book.book_id, Some(read_book))? {
            Some(book) => books.push(book),
            None => tracing::debug!(
                book_id = read_book.book_id,
                "Reading state refers to a book missing from the catalog"
            ),
        }
    }

    Ok(BookPage {
        books,
        pagination: page.pagination(total),
    })
}

fn detail_with_state(
    state: &AppState,
    book_id: i64,
    read_book: Option<&ReadBook>,
) -> Result<Option<BookWithState>> {
    let Some((book, metadata)) = state.catalog.get_book_with_metadata(book_id)? else {
        return Ok(None);
    };

    let book: BookDetail = views::book_detail(&book, &metadata);
    Ok(Some(BookWithState {
        book,
        reading_state: read_book.map(ReadingStateView::from),
    }))
}

// ============================================================================
// SINGLE BOOK
// ============================================================================

/// Book details with the caller's reading state.
pub async fn book_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    BookId(book_id): BookId,
) -> Result<Json<BookWithState>> {
    let read_book = state
        .db
        .get_reading_state(user.id, book_id)
        .context("Failed to retrieve book")?;

    detail_with_state(&state, book_id, read_book.as_ref())
        .context("Failed to retrieve book")?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
}

/// The caller's reading state for a book.
pub async fn book_reading_state(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    BookId(book_id): BookId,
) -> Result<Json<ReadingStateView>> {
    let read_book = state
        .db
        .get_reading_state(user.id, book_id)
        .context("Failed to retrieve reading state")?
        .ok_or_else(|| AppError::NotFound("No reading state found for this book".to_string()))?;

    Ok(Json(ReadingStateView::from(&read_book)))
}

/// Current reading position of a book.
pub async fn book_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    BookId(book_id): BookId,
) -> Result<Json<BookProgress>> {
    let kobo = state
        .db
        .get_reading_state(user.id, book_id)
        .context("Failed to retrieve progress")?
        .and_then(|rb| rb.kobo_reading_state)
        .ok_or_else(|| AppError::NotFound("No progress information found".to_string()))?;

    let bookmark = kobo
        .current_bookmark
        .ok_or_else(|| AppError::NotFound("No bookmark/progress found".to_string()))?;

    Ok(Json(BookProgress {
        book_id,
        progress: ProgressView::from(&bookmark),
    }))
}

/// Reading time statistics of a book.
pub async fn book_statistics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    BookId(book_id): BookId,
) -> Result<Json<BookStatistics>> {
    let kobo = state
        .db
        .get_reading_state(user.id, book_id)
        .context("Failed to retrieve statistics")?
        .and_then(|rb| rb.kobo_reading_state)
        .ok_or_else(|| AppError::NotFound("No reading state found".to_string()))?;

    let stats = kobo
        .statistics
        .ok_or_else(|| AppError::NotFound("No statistics found".to_string()))?;

    Ok(Json(BookStatistics::new(book_id, &stats)))
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Aggregated reading statistics of the caller.
pub async fn statistics_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<StatisticsSummary>> {
    let summary = state
        .db
        .reading_summary(user.id)
        .context("Failed to retrieve statistics summary")?;

    Ok(Json(StatisticsSummary::from(&summary)))
}

// ============================================================================
// BOOKMARKS
// ============================================================================

/// The caller's bookmarks in one book.
pub async fn book_bookmarks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    BookId(book_id): BookId,
) -> Result<Json<BookBookmarks>> {
    let bookmarks: Vec<BookmarkView> = state
        .db
        .get_bookmarks(user.id, book_id)
        .context("Failed to retrieve bookmarks")?
        .iter()
        .map(BookmarkView::from)
        .collect();

    Ok(Json(BookBookmarks {
        book_id,
        count: bookmarks.len(),
        bookmarks,
    }))
}

/// All of the caller's bookmarks with book titles.
pub async fn all_bookmarks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserBookmarks>> {
    titled_bookmarks(&state, &user)
        .context("Failed to retrieve bookmarks")
        .map(Json)
}

fn titled_bookmarks(state: &AppState, user: &User) -> Result<UserBookmarks> {
    let bookmarks = state
        .db
        .get_user_bookmarks(user.id)?
        .iter()
        .map(|bookmark| -> Result<TitledBookmarkView> {
            let title = state.catalog.get_book_title(bookmark.book_id)?;
            Ok(TitledBookmarkView::new(bookmark, title))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(UserBookmarks {
        count: bookmarks.len(),
        bookmarks,
    })
}

// ============================================================================
// AUTH
// ============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user_id: i64,
    username: String,
}

/// Auth login.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = Arc::clone(&state.auth);
    let (user, token) = tokio::task::spawn_blocking(move || auth.login(&req.username, &req.password))
        .await
        .map_err(|e| AppError::Internal(format!("Login task failed: {}", e)))??;
    tracing::info!(user = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

/// Auth logout.
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(&token)?;
    }
    Ok(StatusCode::OK)
}

/// Get current user info.
pub async fn auth_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

// ============================================================================
// HEALTH
// ============================================================================

/// Liveness probe.
pub async fn health() -> Json<Health> {
    Json(Health::now())
}
