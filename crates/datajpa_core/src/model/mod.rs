//! Entity model for members, teams and items.
//!
//! # Responsibility
//! - Define the records persisted by the repository layer.
//! - Own field-level validation shared by every write and read path.
//!
//! # Invariants
//! - Identity never changes once assigned.
//! - Audit timestamps are composed values, not inherited state.
//! - Relations carry an explicit loaded/not-loaded state.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod audit;
pub mod item;
pub mod member;
pub mod projection;
pub mod relation;
pub mod team;

/// Field-level validation failures for entity values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A required text field is empty or whitespace-only.
    BlankField(&'static str),
    /// Age must be zero or positive.
    NegativeAge(i32),
    /// A relation points to an entity that was never persisted.
    TransientReference(&'static str),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::NegativeAge(age) => write!(f, "age must be >= 0, got {age}"),
            Self::TransientReference(entity) => {
                write!(f, "{entity} must be saved before it can be referenced")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankField(field));
    }
    Ok(())
}
