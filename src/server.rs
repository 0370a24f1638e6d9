//! HTTP server and routes.

mod extract;
mod handlers;
mod state;

pub use extract::AuthUser;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Path prefix of all API routes.
pub const API_PREFIX: &str = "/api/v2";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let book_routes = Router::new()
        .route("/books", get(handlers::list_books))
        .route("/books/read", get(handlers::list_read_books))
        .route("/books/reading", get(handlers::list_reading_books))
        .route("/books/{id}", get(handlers::book_detail))
        .route(
            "/books/{id}/reading-state",
            get(handlers::book_reading_state),
        )
        .route("/books/{id}/progress", get(handlers::book_progress))
        .route("/books/{id}/statistics", get(handlers::book_statistics))
        .route("/books/{id}/bookmarks", get(handlers::book_bookmarks));

    let auth_routes = Router::new()
        .route("/auth/login", post(handlers::auth_login))
        .route("/auth/logout", post(handlers::auth_logout))
        .route("/auth/me", get(handlers::auth_me));

    let api_routes = Router::new()
        .merge(book_routes)
        .merge(auth_routes)
        .route("/statistics/summary", get(handlers::statistics_summary))
        .route("/bookmarks", get(handlers::all_bookmarks))
        .route("/health", get(handlers::health));

    Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
