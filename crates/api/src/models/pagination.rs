//! Pagination parameters and paged responses.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// The 1-based page number.
    #[must_use]
    pub fn page(self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// The page size, clamped to `1..=100`.
    #[must_use]
    pub fn per_page(self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let per_page = params.per_page();
        let total = total.max(0);
        Self {
            items,
            total,
            page: params.page(),
            per_page,
            total_pages: (total + i64::from(per_page) - 1) / i64::from(per_page),
        }
    }

    /// Convert the items, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_page_is_clamped() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);

        let params = PageParams {
            page: None,
            per_page: Some(0),
        };
        assert_eq!(params.per_page(), 1);
        assert_eq!(PageParams::default().per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_total_pages() {
        let params = PageParams {
            page: Some(2),
            per_page: Some(10),
        };
        assert_eq!(Page::new(vec![(); 10], 25, params).total_pages, 3);
        assert_eq!(Page::<()>::new(vec![], 0, params).total_pages, 0);
        assert_eq!(Page::new(vec![(); 10], 20, params).total_pages, 2);
    }
}
