//! Page parameters for list endpoints

/// Default items per page
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Maximum items per page
pub const MAX_PER_PAGE: i64 = 100;

/// Normalized 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

/// Highest page whose offset still fits in an i64
const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

impl PageRequest {
    /// Clamp raw query values: page within 1..=MAX_PAGE, per_page within 1..=MAX_PER_PAGE
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1).min(MAX_PAGE);
        let per_page = per_page
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE);
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::new(None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, DEFAULT_PER_PAGE);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit(), MAX_PER_PAGE);

        let page = PageRequest::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = PageRequest::new(Some(i64::MAX), Some(MAX_PER_PAGE));
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() > 0);

        let page = PageRequest::new(Some(i64::MAX), Some(20));
        assert!(page.offset() > 0);
    }
}
