//! Explicit relation load state.
//!
//! Relations are never materialized behind the caller's back: a value is
//! either just a foreign key or a fully loaded record, and the caller picks
//! which one by choosing the repository method.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Entity that may or may not carry an assigned identity yet.
pub trait Identified {
    type Id: Clone + PartialEq + Debug;

    /// Returns the identity, or `None` while the entity is transient.
    fn identity(&self) -> Option<Self::Id>;
}

/// Many-to-one reference to another entity.
///
/// Equality compares the referenced id only, so a reference loaded through a
/// join equals the same reference read without the join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    rename_all = "snake_case",
    bound(
        serialize = "T: Serialize, T::Id: Serialize",
        deserialize = "T: Deserialize<'de>, T::Id: Deserialize<'de>"
    )
)]
pub enum Ref<T: Identified> {
    /// Only the foreign key was read.
    Unloaded(T::Id),
    /// The referenced row was fetched together with the owner.
    Loaded { id: T::Id, value: Box<T> },
}

impl<T: Identified> Ref<T> {
    /// Builds a reference to a persisted entity.
    ///
    /// Returns `None` when `value` has no identity yet.
    pub fn to(value: &T) -> Option<Self> {
        value.identity().map(Self::Unloaded)
    }

    /// Wraps a fetched entity, keeping it loaded.
    pub fn loaded(value: T) -> Option<Self> {
        let id = value.identity()?;
        Some(Self::Loaded {
            id,
            value: Box::new(value),
        })
    }

    pub fn id(&self) -> &T::Id {
        match self {
            Self::Unloaded(id) => id,
            Self::Loaded { id, .. } => id,
        }
    }

    /// Returns the referenced record when it was fetched.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Unloaded(_) => None,
            Self::Loaded { value, .. } => Some(value.as_ref()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

impl<T: Identified> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// Load state of a non-owning collection (e.g. `Team.members`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fetched<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Fetched<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(value) => Some(value),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}
