pub mod cat;
pub mod log_entry;
pub mod media;
pub mod settings;
pub mod translation;

pub use cat::*;
pub use log_entry::*;
pub use media::*;
pub use settings::*;
pub use translation::*;

use serde::{Deserialize, Serialize};

/// Paginated list wrapper shared by list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let total_pages = if per_page > 0 {
            total.div_ceil(per_page as u64) as u32
        } else {
            1
        };

        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_response_page_math() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 7, 2, 3);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);

        let last = PaginatedResponse::<u8>::new(vec![], 6, 2, 3);
        assert_eq!(last.total_pages, 2);
        assert!(!last.has_next);
    }
}
