//! Team entity.

use crate::model::audit::AuditFields;
use crate::model::member::Member;
use crate::model::relation::{Fetched, Identified};
use crate::model::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Storage-generated team identifier.
pub type TeamId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<TeamId>,
    pub name: String,
    /// Back-reference only; the `member.team_id` column owns the relation.
    #[serde(default)]
    pub members: Fetched<Vec<Member>>,
    pub audit: AuditFields,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            members: Fetched::NotLoaded,
            audit: AuditFields::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("team name", &self.name)
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.audit == other.audit
    }
}

impl Identified for Team {
    type Id = TeamId;

    fn identity(&self) -> Option<TeamId> {
        self.id
    }
}
