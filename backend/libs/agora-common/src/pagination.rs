//! Page-number pagination shared by list endpoints

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be >= 1")]
    InvalidPage,

    #[error("page_size must be between 1 and {max}")]
    InvalidPageSize { max: u32 },
}

/// Raw `?page=&page_size=` parameters as sent by the client
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self { page, page_size }
    }

    /// Apply defaults and bounds.
    pub fn resolve(&self, default_size: u32, max_size: u32) -> Result<PageRequest, PaginationError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(PaginationError::InvalidPage);
        }

        let limit = self.page_size.unwrap_or(default_size);
        if limit < 1 || limit > max_size {
            return Err(PaginationError::InvalidPageSize { max: max_size });
        }

        Ok(PageRequest { page, limit })
    }
}

/// A validated page window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn limit(&self) -> i64 {
        self.limit as i64
    }

    /// Slice an already-ordered, in-memory collection to this window
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// Standard paginated response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

impl<T> PagedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let has_more = (request.page as i64) * (request.limit as i64) < total;
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResponse<U> {
        PagedResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let req = PageQuery::default().resolve(10, 100).unwrap();
        assert_eq!(req, PageRequest::new(1, 10));
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn rejects_page_zero() {
        let err = PageQuery::new(Some(0), None).resolve(10, 100).unwrap_err();
        assert_eq!(err, PaginationError::InvalidPage);
    }

    #[test]
    fn rejects_page_size_out_of_bounds() {
        assert!(PageQuery::new(None, Some(0)).resolve(10, 100).is_err());
        assert!(PageQuery::new(None, Some(101)).resolve(10, 100).is_err());
        assert!(PageQuery::new(None, Some(100)).resolve(10, 100).is_ok());
    }

    #[test]
    fn offset_tracks_page() {
        let req = PageRequest::new(3, 20);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn slice_returns_window() {
        let items: Vec<i32> = (1..=25).collect();
        assert_eq!(PageRequest::new(3, 10).slice(&items), vec![21, 22, 23, 24, 25]);
        assert!(PageRequest::new(4, 10).slice(&items).is_empty());
    }

    #[test]
    fn paged_response_calculates_has_more() {
        let first = PagedResponse::new(vec![1, 2, 3], 100, PageRequest::new(1, 5));
        assert!(first.has_more);

        let last = PagedResponse::new(vec![96, 97, 98, 99, 100], 100, PageRequest::new(20, 5));
        assert!(!last.has_more);
    }

    #[test]
    fn map_preserves_window() {
        let page = PagedResponse::new(vec![1, 2], 2, PageRequest::new(1, 10)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 2);
        assert!(!page.has_more);
    }
}
