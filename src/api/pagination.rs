//! Pagination, sorting and search parameters for list endpoints

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    pub page: Option<u32>,

    /// Items per page
    #[serde(alias = "perPage")]
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Maximum allowed items per page
    pub const MAX_PER_PAGE: u32 = 100;

    /// Returns the clamped per_page value
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, Self::MAX_PER_PAGE)
    }

    /// Returns the page (1-indexed, minimum 1)
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Calculate SQL OFFSET
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.per_page()
    }

    /// Calculate SQL LIMIT
    pub fn limit(&self) -> u32 {
        self.per_page()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Common list query parameters: pagination plus search/sort/order.
///
/// Kept flat (no serde flatten) because query-string deserialization
/// cannot route numeric fields through flattened structs.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListParams {
    pub page: Option<u32>,

    #[serde(alias = "perPage")]
    pub per_page: Option<u32>,

    /// Substring search, matched against resource-specific columns
    pub search: Option<String>,

    /// Sort column key; must be on the resource's whitelist
    pub sort: Option<String>,

    /// Sort direction
    #[serde(default)]
    pub order: SortOrder,
}

impl ListParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Resolves the sort column against a whitelist. Unknown or missing
    /// keys fall back to `default_col` so callers can splice the result
    /// into an ORDER BY clause safely.
    pub fn sort_column<'a>(&self, allowed: &[&'a str], default_col: &'a str) -> &'a str {
        match &self.sort {
            Some(s) => allowed
                .iter()
                .find(|c| **c == s.as_str())
                .copied()
                .unwrap_or(default_col),
            None => default_col,
        }
    }

    /// ILIKE pattern for the search term, if present and non-empty.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(params: &PaginationParams, total_items: u64) -> Self {
        let per_page = params.per_page();
        let page = params.page();
        let total_pages = ((total_items as f64) / (per_page as f64)).ceil() as u32;

        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total_items: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(params, total_items),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_page_is_clamped() {
        let p = PaginationParams {
            page: None,
            per_page: Some(5000),
        };
        assert_eq!(p.per_page(), PaginationParams::MAX_PER_PAGE);

        let p = PaginationParams {
            page: None,
            per_page: Some(0),
        };
        assert_eq!(p.per_page(), 1);
    }

    #[test]
    fn defaults_and_offset() {
        let p = PaginationParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 20);
        assert_eq!(p.offset(), 0);

        let p = PaginationParams {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn sort_column_respects_whitelist() {
        let mut params = ListParams::default();
        params.sort = Some("name".to_string());
        assert_eq!(params.sort_column(&["name", "code"], "created_at"), "name");

        params.sort = Some("created_at; DROP TABLE sites".to_string());
        assert_eq!(
            params.sort_column(&["name", "code"], "created_at"),
            "created_at"
        );

        params.sort = None;
        assert_eq!(params.sort_column(&["name"], "created_at"), "created_at");
    }

    #[test]
    fn search_pattern_trims_and_skips_empty() {
        let mut params = ListParams::default();
        params.search = Some("  tower ".to_string());
        assert_eq!(params.search_pattern().as_deref(), Some("%tower%"));

        params.search = Some("   ".to_string());
        assert!(params.search_pattern().is_none());
    }

    #[test]
    fn meta_totals() {
        let p = PaginationParams {
            page: Some(2),
            per_page: Some(10),
        };
        let meta = PaginationMeta::new(&p, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
    }
}
