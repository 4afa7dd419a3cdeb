//! Item entity with a client-assigned identifier.
//!
//! Because the id is known before the first insert, "is new" is decided by
//! the absence of `audit.created_at` rather than by id presence.

use crate::model::audit::AuditFields;
use crate::model::relation::Identified;
use crate::model::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub audit: AuditFields,
}

impl Item {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            audit: AuditFields::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("item id", &self.id)
    }
}

impl Identified for Item {
    type Id = ItemId;

    fn identity(&self) -> Option<ItemId> {
        Some(self.id.clone())
    }
}
