//! Paged Results
//! Mission: Page content and totals computed from the same filter

use serde::Serialize;

/// One page of results plus totals.
///
/// Built by [`SoftDeleteStore::paged_list`](super::SoftDeleteStore::paged_list)
/// so the count and the page always come from the same filter and cannot
/// disagree about what is visible.
#[derive(Debug, Clone, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, page_number: u64, page_size: u64, total_count: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size)
        };
        Self {
            items,
            page_number,
            page_size,
            total_count,
            total_pages,
        }
    }

    /// Convert the page items, keeping the paging envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
