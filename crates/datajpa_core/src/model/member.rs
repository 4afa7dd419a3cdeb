//! Member entity.
//!
//! # Invariants
//! - `id` is assigned by storage on first insert.
//! - `team`, when present, references a persisted team.

use crate::model::audit::AuditFields;
use crate::model::relation::{Identified, Ref};
use crate::model::team::{Team, TeamId};
use crate::model::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Storage-generated member identifier.
pub type MemberId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<MemberId>,
    pub username: String,
    pub age: i32,
    /// Many-to-one team relation, owned by the member row (`team_id`).
    pub team: Option<Ref<Team>>,
    pub audit: AuditFields,
}

impl Member {
    /// Creates a transient member with age `0` and no team.
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team: None,
            audit: AuditFields::default(),
        }
    }

    /// Creates a transient member belonging to `team`.
    ///
    /// # Errors
    /// - `TransientReference` when `team` has not been saved yet.
    pub fn with_team(
        username: impl Into<String>,
        age: i32,
        team: &Team,
    ) -> Result<Self, ModelValidationError> {
        let mut member = Self::with_age(username, age);
        member.change_team(team)?;
        Ok(member)
    }

    /// Moves this member to another persisted team.
    pub fn change_team(&mut self, team: &Team) -> Result<(), ModelValidationError> {
        self.team = Some(Ref::to(team).ok_or(ModelValidationError::TransientReference("team"))?);
        Ok(())
    }

    pub fn leave_team(&mut self) {
        self.team = None;
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team.as_ref().map(|team| *team.id())
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("username", &self.username)?;
        if self.age < 0 {
            return Err(ModelValidationError::NegativeAge(self.age));
        }
        Ok(())
    }
}

impl Identified for Member {
    type Id = MemberId;

    fn identity(&self) -> Option<MemberId> {
        self.id
    }
}
