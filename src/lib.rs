//! bookinfo-api: a read-only REST API over a Calibre library.
//!
//! Serves book metadata from Calibre's `metadata.db` together with
//! per-user reading state (status, Kobo progress and reading time) and
//! bookmarks, as paginated JSON under `/api/v2`.
//!
//! # Features
//!
//! - Paginated, sortable book listing
//! - Finished and in-progress shelves per user
//! - Kobo progress and reading statistics per book
//! - Reading statistics summary
//! - Bookmarks per book and per user
//! - Bearer session tokens and HTTP Basic authentication

#![forbid(unsafe_code)]

/// Authentication and user management.
pub mod auth;
/// Configuration and CLI.
pub mod config;
/// User-state database.
pub mod db;
/// Error types.
pub mod error;
/// Calibre catalog.
pub mod library;
/// Pagination parameters.
pub mod pagination;
/// HTTP server.
pub mod server;
/// JSON views.
pub mod views;


pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use library::Catalog;
pub use server::AppState;
