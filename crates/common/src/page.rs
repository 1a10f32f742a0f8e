//! Keyset pagination primitives
//!
//! List endpoints page newest-first over a `(created_at, id)` descending
//! order. The cursor is the id of the last row the caller has seen; `None`
//! starts from the top.

use serde::Serialize;
use uuid::Uuid;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size for list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

/// A resolved page request: cursor + clamped size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Start strictly after this row in descending order; `None` = first page
    pub after: Option<Uuid>,
    /// Number of rows to return, already clamped to `1..=MAX_PAGE_SIZE`
    pub size: i64,
}

impl PageRequest {
    pub fn new(after: Option<Uuid>, size: Option<i64>) -> Self {
        Self {
            after,
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// First page with the default size
    pub fn first() -> Self {
        Self::new(None, None)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64) -> Self {
        Self { data, total }
    }

    /// Map the page contents, keeping the total
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::first();
        assert_eq!(req.after, None);
        assert_eq!(req.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_request_size_clamped_to_max() {
        let req = PageRequest::new(None, Some(500));
        assert_eq!(req.size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_request_size_clamped_to_min() {
        let req = PageRequest::new(None, Some(0));
        assert_eq!(req.size, 1);
        let req = PageRequest::new(None, Some(-3));
        assert_eq!(req.size, 1);
    }

    #[test]
    fn test_page_request_cursor_preserved() {
        let id = Uuid::new_v4();
        let req = PageRequest::new(Some(id), Some(10));
        assert_eq!(req.after, Some(id));
        assert_eq!(req.size, 10);
    }

    #[test]
    fn test_page_map_keeps_total() {
        let page = Page::new(vec![1, 2, 3], 7);
        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.data, vec![2, 4, 6]);
        assert_eq!(mapped.total, 7);
    }
}
