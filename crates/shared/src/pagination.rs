//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Maximum page size accepted from clients.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters (`?page=1&per_page=20`).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps page and per_page to sane bounds.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// SQL LIMIT for the normalized parameters.
    pub fn limit(&self) -> i64 {
        i64::from(self.normalized().per_page)
    }

    /// SQL OFFSET for the normalized parameters.
    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        i64::from(p.page - 1) * i64::from(p.per_page)
    }
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn new(params: PaginationParams, total: i64) -> Self {
        let params = params.normalized();
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(params.per_page))) as u32
        };
        Self {
            page: params.page,
            per_page: params.per_page,
            total,
            total_pages,
        }
    }
}

/// A page of results with metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_offset_for_later_pages() {
        let params = PaginationParams {
            page: 3,
            per_page: 25,
        };
        assert_eq!(params.offset(), 50);
        assert_eq!(params.limit(), 25);
    }

    #[test]
    fn test_normalization_clamps_bounds() {
        let params = PaginationParams {
            page: 0,
            per_page: 10_000,
        }
        .normalized();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_info_totals() {
        let params = PaginationParams {
            page: 1,
            per_page: 20,
        };
        assert_eq!(PageInfo::new(params, 0).total_pages, 0);
        assert_eq!(PageInfo::new(params, 1).total_pages, 1);
        assert_eq!(PageInfo::new(params, 20).total_pages, 1);
        assert_eq!(PageInfo::new(params, 21).total_pages, 2);
    }
}
