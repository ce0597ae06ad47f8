use serde::Serialize;

/// One page of an ordered result set plus the totals of the whole set
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PagedList<T> {
    pub data: Vec<T>,
    pub current_page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> PagedList<T> {
    /// Builds a page. An empty result set always reports zeroes, whatever page
    /// was asked for.
    pub fn new(data: Vec<T>, current_page: usize, page_size: usize, total_count: usize) -> Self {
        if total_count == 0 || page_size == 0 {
            return Self::empty();
        }

        return Self {
            data,
            current_page,
            page_size,
            total_count,
            total_pages: total_count.div_ceil(page_size),
        };
    }

    pub fn empty() -> Self {
        return Self {
            data: vec![],
            current_page: 0,
            page_size: 0,
            total_count: 0,
            total_pages: 0,
        };
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}
