//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::library::Catalog;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Calibre catalog (read-only).
    pub catalog: Catalog,
    /// User-state database.
    pub db: Database,
    /// Authentication service.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, catalog: Catalog, db: Database, auth: AuthService) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            db,
            auth: Arc::new(auth),
        }
    }
}
