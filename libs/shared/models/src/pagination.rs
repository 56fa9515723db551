use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Page request as sent by clients; both fields are 1-based / optional.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageRequest {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE)
    }

    /// Saturates for pages far past the end; those slice to nothing.
    pub fn offset(&self) -> usize {
        (self.page() as usize - 1).saturating_mul(self.per_page() as usize)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub total: usize,
    pub pages: u32,
    pub page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Slice an already ordered result set. Pages past the end are empty.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let per_page = request.per_page();
        let page = request.page();
        let pages = total.div_ceil(per_page as usize) as u32;

        let items = all
            .into_iter()
            .skip(request.offset())
            .take(per_page as usize)
            .collect();

        Self {
            items,
            pagination: Pagination {
                total,
                pages,
                page,
                per_page,
                has_next: page < pages,
                has_prev: page > 1,
            },
        }
    }
}
