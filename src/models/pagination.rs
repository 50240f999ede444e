//! Pagination types
//!
//! `ListParams` and `PagedResult` carry LIMIT/OFFSET slices between the
//! repositories and the services. `PageRequest` parses the `?page=` query
//! value the way list pages accept it: a positive number or `last`.

use serde::{Deserialize, Serialize};

/// Largest page size a list query will serve
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 3,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of an ordered collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Number of pages; an empty collection still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        page_count(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Navigation data for page templates.
    pub fn info(&self) -> PageInfo {
        let num_pages = self.total_pages();
        let has_next = self.has_next();
        let has_previous = self.has_prev();
        let start_index = if self.items.is_empty() {
            0
        } else {
            (self.page as i64 - 1) * self.per_page as i64 + 1
        };
        PageInfo {
            number: self.page,
            num_pages,
            has_next,
            has_previous,
            has_other_pages: num_pages > 1,
            next_page_number: has_next.then(|| self.page + 1),
            previous_page_number: has_previous.then(|| self.page - 1),
            start_index,
            end_index: if self.items.is_empty() {
                0
            } else {
                start_index + self.items.len() as i64 - 1
            },
            total: self.total,
        }
    }

    /// Transform every item while keeping the page position.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Page navigation exposed to templates as `page_obj`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub has_other_pages: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
    /// 1-based index of the first item on the page, 0 when empty
    pub start_index: i64,
    pub end_index: i64,
    pub total: i64,
}

fn page_count(total: i64, per_page: u32) -> u32 {
    if per_page == 0 || total <= 0 {
        return 1;
    }
    let per_page = per_page as i64;
    ((total + per_page - 1) / per_page) as u32
}

/// A requested page, before it is checked against the collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u32),
    Last,
}

/// Reasons a requested page cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPage {
    #[error("That page number is not an integer")]
    NotAnInteger,
    #[error("That page number is less than 1")]
    LessThanOne,
    #[error("That page contains no results")]
    Empty,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

impl PageRequest {
    /// Parse the raw `page` query value. Absent or blank means page 1.
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidPage> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(PageRequest::Number(1)),
            Some(raw) => raw,
        };
        if raw == "last" {
            return Ok(PageRequest::Last);
        }
        let number: i64 = raw.parse().map_err(|_| InvalidPage::NotAnInteger)?;
        if number < 1 {
            return Err(InvalidPage::LessThanOne);
        }
        u32::try_from(number)
            .map(PageRequest::Number)
            .map_err(|_| InvalidPage::Empty)
    }

    /// Resolve against a collection of `total` items split into pages of
    /// `per_page`, capped at [`MAX_PER_PAGE`].
    pub fn resolve(self, total: i64, per_page: u32) -> Result<ListParams, InvalidPage> {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let num_pages = page_count(total, per_page);
        let page = match self {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) if n > num_pages => return Err(InvalidPage::Empty),
            PageRequest::Number(n) => n,
        };
        Ok(ListParams::new(page, per_page))
    }
}
