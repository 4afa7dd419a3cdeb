//! Sorting and paging values.
//!
//! # Invariants
//! - `total_pages = ceil(total_elements / size)`.
//! - `has_next = (number + 1) * size < total_elements`.
//! - Page size is never zero once a request is validated.

use super::Field;
use crate::repo::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order<F: Field> {
    pub field: F,
    pub direction: Direction,
}

/// Ordered list of sort keys. Empty means storage order by primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort<F: Field> {
    orders: Vec<Order<F>>,
}

impl<F: Field> Default for Sort<F> {
    fn default() -> Self {
        Self::unsorted()
    }
}

impl<F: Field> Sort<F> {
    pub fn unsorted() -> Self {
        Self { orders: Vec::new() }
    }

    pub fn by(direction: Direction, field: F) -> Self {
        Self::unsorted().then(direction, field)
    }

    pub fn asc(field: F) -> Self {
        Self::by(Direction::Asc, field)
    }

    pub fn desc(field: F) -> Self {
        Self::by(Direction::Desc, field)
    }

    /// Appends a lower-priority sort key.
    pub fn then(mut self, direction: Direction, field: F) -> Self {
        self.orders.push(Order { field, direction });
        self
    }

    pub fn orders(&self) -> &[Order<F>] {
        &self.orders
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<F: Field> {
    pub page: u32,
    pub size: u32,
    pub sort: Sort<F>,
}

impl<F: Field> PageRequest<F> {
    pub fn of(page: u32, size: u32) -> Self {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: u32, size: u32, sort: Sort<F>) -> Self {
        Self { page, size, sort }
    }

    pub fn validate(&self) -> RepoResult<()> {
        if self.size == 0 {
            return Err(RepoError::InvalidPageRequest(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    pub fn next(&self) -> Self {
        Self::of_sorted(self.page.saturating_add(1), self.size, self.sort.clone())
    }
}

/// One page of results with exact total count metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub is_first: bool,
    pub is_last: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Builds page metadata; `size` must be non-zero.
    pub fn new(content: Vec<T>, number: u32, size: u32, total_elements: u64) -> Self {
        let size_u64 = u64::from(size.max(1));
        let total_pages = total_elements.div_ceil(size_u64);
        let has_next = (u64::from(number) + 1) * size_u64 < total_elements;
        Self {
            content,
            number,
            size,
            total_elements,
            total_pages,
            is_first: number == 0,
            is_last: !has_next,
            has_next,
        }
    }

    /// Converts the content while keeping every paging field.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            is_first: self.is_first,
            is_last: self.is_last,
            has_next: self.has_next,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }
}

/// Page without a total count; `has_next` comes from fetching one extra row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Trims a `size + 1` probe fetch down to `size` rows.
    pub(crate) fn from_probe(mut rows: Vec<T>, number: u32, size: u32) -> Self {
        let limit = size as usize;
        let has_next = rows.len() > limit;
        rows.truncate(limit);
        Self {
            content: rows,
            number,
            size,
            has_next,
        }
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            has_next: self.has_next,
        }
    }
}
