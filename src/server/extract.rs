//! Request extractors: caller identity, book id, and query parameters.

use crate::db::User;
use crate::error::AppError;
use crate::pagination::PageParams;
use crate::server::AppState;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{HeaderMap, HeaderValue, header, request::Parts};
use axum::response::{IntoResponse, Response};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::convert::Infallible;
use std::sync::Arc;

const BASIC_CHALLENGE: &str = "Basic realm=\"bookinfo-api\"";

/// Authenticated caller, resolved from a bearer session token or, when
/// enabled, HTTP Basic credentials.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let basic_auth = state.config.auth.basic_auth;
        let user = match credentials(&parts.headers) {
            Some(Credentials::Bearer(token)) => state.auth.validate_token(&token),
            Some(Credentials::Basic { username, password }) if basic_auth => {
                authenticate(state, username, password).await
            }
            _ => Ok(None),
        }
        .map_err(IntoResponse::into_response)?;

        user.map(AuthUser).ok_or_else(|| {
            tracing::debug!(uri = %parts.uri, "Rejected unauthenticated request");
            unauthorized(basic_auth)
        })
    }
}

/// Argon2 verification runs on the blocking pool.
async fn authenticate(
    state: &AppState,
    username: String,
    password: String,
) -> crate::error::Result<Option<User>> {
    let auth = Arc::clone(&state.auth);
    tokio::task::spawn_blocking(move || auth.authenticate(&username, &password))
        .await
        .map_err(|e| AppError::Internal(format!("Authentication task failed: {}", e)))?
}

/// 401 response; the Basic challenge is only sent when Basic auth is on.
fn unauthorized(basic_auth: bool) -> Response {
    let mut response =
        AppError::Unauthorized("Authentication required".to_string()).into_response();
    if basic_auth {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
    }
    response
}

/// `{id}` path segment of the book routes.
#[derive(Debug, Clone, Copy)]
pub struct BookId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for BookId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "Rejected book id");
                AppError::InvalidRequest("Invalid book id".to_string())
            })?;
        Ok(BookId(id))
    }
}

/// Query string as ordered key/value pairs. Undecodable input yields no
/// pairs, so callers fall back to their defaults.
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl QueryPairs {
    /// First value given for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `page` and `per_page` parameters.
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.first("page").map(str::to_string),
            per_page: self.first("per_page").map(str::to_string),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for QueryPairs {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_else(|rejection| {
                tracing::debug!(error = %rejection, "Ignoring undecodable query string");
                Vec::new()
            });
        Ok(QueryPairs(pairs))
    }
}

/// Credentials carried by the Authorization header.
#[derive(Debug, PartialEq, Eq)]
enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

fn credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    if let Some(token) = value.strip_prefix("Bearer ") {
        return Some(Credentials::Bearer(token.trim().to_string()));
    }

    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials::Basic {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    match credentials(headers)? {
        Credentials::Bearer(token) => Some(token),
        Credentials::Basic { .. } => None,
    }
}
