//! Page parameter parsing and page arithmetic.
//!
//! Malformed values are coerced to defaults rather than rejected, so the
//! raw query values are kept as strings.

use serde::Serialize;

/// Default page size.
pub const DEFAULT_PER_PAGE: i64 = 20;
/// Largest accepted page size.
pub const MAX_PER_PAGE: i64 = 100;

/// Raw `page`/`per_page` query parameters.
#[derive(Debug, Clone, Default)]
pub struct PageParams {
    /// Requested page (1-based).
    pub page: Option<String>,
    /// Requested page size.
    pub per_page: Option<String>,
}

impl PageParams {
    /// Resolve into an effective page request.
    pub fn resolve(&self) -> PageRequest {
        PageRequest::new(
            parse_or(self.page.as_deref(), 1),
            parse_or(self.per_page.as_deref(), DEFAULT_PER_PAGE),
        )
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

/// Clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl PageRequest {
    /// Floor `page` at 1 and clamp `per_page` to `1..=MAX_PER_PAGE`.
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Effective page.
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Effective page size, also the query limit.
    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Build the pagination block for a result set of `total` rows.
    pub fn pagination(&self, total: i64) -> Pagination {
        let total = total.max(0);
        Pagination {
            page: self.page,
            per_page: self.per_page,
            total,
            pages: (total + self.per_page - 1) / self.per_page,
        }
    }
}

/// `pagination` object of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}
