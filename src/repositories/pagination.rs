//! Pagination - Page metadata and paged repository results

use serde::Serialize;

/// Raw pagination figures of a list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub count: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Wire shape of pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// `limit` of 0 is treated as 1.
    pub fn new(count: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            count,
            page: page.max(1),
            limit,
            total_pages: count.div_ceil(limit),
        }
    }

    pub fn meta(&self) -> PaginationMeta {
        PaginationMeta {
            current_page: self.page,
            total_pages: self.total_pages,
            total_items: self.count,
            items_per_page: self.limit,
            has_next_page: self.page < self.total_pages,
            has_previous_page: self.page > 1,
        }
    }
}

/// One page of entities, ready for the response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub message: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            message: self.message,
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Result of a list operation: the raw matching set, or a page when a query spec was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(Page<T>),
}

impl<T> Listing<T> {
    pub fn map<U, F>(self, f: F) -> Listing<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Self::All(items) => Listing::All(items.into_iter().map(f).collect()),
            Self::Page(page) => Listing::Page(page.map(f)),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::All(items) => items,
            Self::Page(page) => &page.data,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::All(items) => items,
            Self::Page(page) => page.data,
        }
    }
}
