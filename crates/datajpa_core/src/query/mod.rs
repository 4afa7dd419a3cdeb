//! Structured query building.
//!
//! # Responsibility
//! - Describe filters, sorting, paging and bulk updates as plain values.
//! - Compile those values into SQL fragments with positional parameters.
//!
//! # Invariants
//! - Field references are typed per entity; a member field can never be used
//!   in a team query.
//! - Every bound value travels as a parameter, never as SQL text.

pub mod named;
pub mod page;
pub mod predicate;
pub mod spec;

use std::fmt::Debug;
use std::ops::Deref;

pub use named::{NamedQuery, NamedQueryRegistry, QueryParams};
pub use page::{Direction, Order, Page, PageRequest, Slice, Sort};
pub use predicate::{ComparisonOp, FieldUpdate, Predicate};
pub use rusqlite::types::Value;
pub use spec::Specification;

use crate::db::LockMode;

/// Typed reference to one queryable column of an entity.
pub trait Field: Copy + Debug + Eq + 'static {
    /// Column expression qualified with the entity alias (`m.username`).
    fn column(self) -> &'static str;

    /// Unqualified column name, used as an UPDATE target.
    fn column_name(self) -> &'static str;

    /// Property path used by named queries (`username`, `team.name`).
    fn name(self) -> &'static str;

    /// Every field of the entity.
    fn all() -> &'static [Self];

    /// Join clause needed to reach this column, if it lives on a relation.
    fn join(self) -> Option<&'static str> {
        None
    }

    /// Whether bulk updates may assign this column.
    fn is_writable(self) -> bool {
        self.join().is_none()
    }

    /// Whether the column holds integers, so `FieldUpdate::Add` may target it.
    fn is_numeric(self) -> bool {
        false
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|field| field.name() == name)
    }
}

/// Filter plus sort, window and lock options for one select.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<F: Field> {
    pub filter: Specification<F>,
    pub sort: Sort<F>,
    pub limit: Option<u64>,
    pub offset: u64,
    pub lock: LockMode,
}

impl<F: Field> Query<F> {
    pub fn new(filter: Specification<F>) -> Self {
        Self {
            filter,
            sort: Sort::unsorted(),
            limit: None,
            offset: 0,
            lock: LockMode::None,
        }
    }

    pub fn sorted(mut self, sort: Sort<F>) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = mode;
        self
    }
}

impl<F: Field> From<Specification<F>> for Query<F> {
    fn from(filter: Specification<F>) -> Self {
        Self::new(filter)
    }
}

/// Entity loaded with a read-only hint.
///
/// Derefs to the loaded value but offers no mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOnly<T>(T);

impl<T> ReadOnly<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for ReadOnly<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}
