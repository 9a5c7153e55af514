//! Page parameters shared by list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Pagination parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// The 0-indexed page to fetch.
    page: Option<i64>,
    /// The number of elements per page.
    page_size: Option<i64>,
}

impl PaginationParams {
    /// Upper bound on `page_size`.
    pub const MAX_PAGE_SIZE: i64 = 200;

    /// Explicit parameters.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(0).max(0)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(50).clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.page_size()
    }

    /// Rows to skip. Saturates instead of overflowing on absurd pages.
    pub fn offset(&self) -> i64 {
        self.page().saturating_mul(self.page_size())
    }
}
