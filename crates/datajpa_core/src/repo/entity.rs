//! Table mappings for the entity model.
//!
//! # Responsibility
//! - Describe each entity's table, columns and identity strategy.
//! - Convert rows to entities and entities to bind values.
//!
//! # Invariants
//! - `DATA_COLUMNS` and `data_values()` have the same length and order.
//! - Audit columns (`created_at`, `last_modified_at`) are handled by the
//!   generic repository, never listed in `DATA_COLUMNS`.

use crate::model::audit::AuditFields;
use crate::model::item::Item;
use crate::model::member::Member;
use crate::model::relation::{Fetched, Identified, Ref};
use crate::model::team::Team;
use crate::model::{require_text, ModelValidationError};
use crate::query::{Field, Value};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Row;

/// Join from `member m` to its team, aliased `t`.
pub const MEMBER_TEAM_JOIN: &str = "LEFT JOIN team t ON t.team_id = m.team_id";

/// Persistence mapping implemented by every stored entity.
pub trait Entity: Identified + Sized {
    type Field: Field;

    /// Entity name used in named queries and error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ALIAS: &'static str;
    const ID_COLUMN: &'static str;
    /// Whether storage assigns the id on insert.
    const GENERATED_ID: bool;
    const DATA_COLUMNS: &'static [&'static str];

    /// Decides between INSERT and UPDATE on save.
    fn is_new(&self) -> bool {
        self.identity().is_none()
    }

    fn audit(&self) -> &AuditFields;
    fn audit_mut(&mut self) -> &mut AuditFields;
    fn validate(&self) -> Result<(), ModelValidationError>;
    fn data_values(&self) -> Vec<Value>;
    fn id_value(id: &Self::Id) -> Value;
    fn id_to_string(id: &Self::Id) -> String;

    /// Checks a bulk-update value for `field` against the same rules as
    /// [`Entity::validate`].
    fn validate_assignment(field: Self::Field, value: &Value) -> RepoResult<()> {
        let _ = (field, value);
        Ok(())
    }

    /// Stores the rowid assigned by an INSERT.
    fn assign_generated_id(&mut self, _rowid: i64) {}

    /// Reads one entity from a row produced by [`select_list`].
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Qualified select list: id, data columns, audit columns.
pub fn select_list<T: Entity>() -> String {
    let mut columns = vec![format!("{}.{}", T::ALIAS, T::ID_COLUMN)];
    columns.extend(
        T::DATA_COLUMNS
            .iter()
            .map(|column| format!("{}.{column}", T::ALIAS)),
    );
    columns.push(format!("{}.created_at", T::ALIAS));
    columns.push(format!("{}.last_modified_at", T::ALIAS));
    columns.join(", ")
}

pub(crate) fn read_audit(row: &Row<'_>, prefix: &str) -> rusqlite::Result<AuditFields> {
    Ok(AuditFields {
        created_at: row.get(format!("{prefix}created_at").as_str())?,
        last_modified_at: row.get(format!("{prefix}last_modified_at").as_str())?,
    })
}

fn require_text_value(field: &'static str, value: &Value) -> RepoResult<()> {
    match value {
        Value::Text(text) => Ok(require_text(field, text)?),
        other => Err(RepoError::InvalidQuery(format!(
            "{field} must be text, got {:?}",
            other.data_type()
        ))),
    }
}

fn mismatched_value<F: Field>(field: F, value: &Value) -> RepoError {
    RepoError::InvalidQuery(format!(
        "field `{}` cannot be assigned a {:?} value",
        field.name(),
        value.data_type()
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberField {
    Id,
    Username,
    Age,
    TeamId,
    /// `team.name`, reached through [`MEMBER_TEAM_JOIN`].
    TeamName,
    CreatedAt,
    LastModifiedAt,
}

impl Field for MemberField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "m.member_id",
            Self::Username => "m.username",
            Self::Age => "m.age",
            Self::TeamId => "m.team_id",
            Self::TeamName => "t.name",
            Self::CreatedAt => "m.created_at",
            Self::LastModifiedAt => "m.last_modified_at",
        }
    }

    fn column_name(self) -> &'static str {
        match self {
            Self::Id => "member_id",
            Self::Username => "username",
            Self::Age => "age",
            Self::TeamId => "team_id",
            Self::TeamName => "name",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Age => "age",
            Self::TeamId => "team.id",
            Self::TeamName => "team.name",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Id,
            Self::Username,
            Self::Age,
            Self::TeamId,
            Self::TeamName,
            Self::CreatedAt,
            Self::LastModifiedAt,
        ]
    }

    fn join(self) -> Option<&'static str> {
        match self {
            Self::TeamName => Some(MEMBER_TEAM_JOIN),
            _ => None,
        }
    }

    fn is_writable(self) -> bool {
        matches!(self, Self::Username | Self::Age | Self::TeamId)
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Age)
    }
}

impl Entity for Member {
    type Field = MemberField;

    const NAME: &'static str = "Member";
    const TABLE: &'static str = "member";
    const ALIAS: &'static str = "m";
    const ID_COLUMN: &'static str = "member_id";
    const GENERATED_ID: bool = true;
    const DATA_COLUMNS: &'static [&'static str] = &["username", "age", "team_id"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        Member::validate(self)
    }

    fn validate_assignment(field: MemberField, value: &Value) -> RepoResult<()> {
        match (field, value) {
            (MemberField::Username, value) => require_text_value("username", value),
            (MemberField::Age, Value::Integer(age)) => {
                let age = i32::try_from(*age).map_err(|_| {
                    RepoError::InvalidQuery(format!("age {age} is out of range"))
                })?;
                if age < 0 {
                    return Err(ModelValidationError::NegativeAge(age).into());
                }
                Ok(())
            }
            (MemberField::TeamId, Value::Integer(_) | Value::Null) => Ok(()),
            (field, value) => Err(mismatched_value(field, value)),
        }
    }

    fn data_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.username.clone()),
            Value::Integer(i64::from(self.age)),
            self.team_id().map_or(Value::Null, Value::Integer),
        ]
    }

    fn id_value(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn id_to_string(id: &i64) -> String {
        id.to_string()
    }

    fn assign_generated_id(&mut self, rowid: i64) {
        self.id = Some(rowid);
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let member = Member {
            id: Some(row.get("member_id")?),
            username: row.get("username")?,
            age: row.get("age")?,
            team: row
                .get::<_, Option<i64>>("team_id")?
                .map(Ref::Unloaded),
            audit: read_audit(row, "")?,
        };
        member.validate()?;
        Ok(member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    Id,
    Name,
    CreatedAt,
    LastModifiedAt,
}

impl Field for TeamField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "t.team_id",
            Self::Name => "t.name",
            Self::CreatedAt => "t.created_at",
            Self::LastModifiedAt => "t.last_modified_at",
        }
    }

    fn column_name(self) -> &'static str {
        match self {
            Self::Id => "team_id",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Id, Self::Name, Self::CreatedAt, Self::LastModifiedAt]
    }

    fn is_writable(self) -> bool {
        self == Self::Name
    }
}

impl Entity for Team {
    type Field = TeamField;

    const NAME: &'static str = "Team";
    const TABLE: &'static str = "team";
    const ALIAS: &'static str = "t";
    const ID_COLUMN: &'static str = "team_id";
    const GENERATED_ID: bool = true;
    const DATA_COLUMNS: &'static [&'static str] = &["name"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        Team::validate(self)
    }

    fn validate_assignment(field: TeamField, value: &Value) -> RepoResult<()> {
        match field {
            TeamField::Name => require_text_value("team name", value),
            field => Err(mismatched_value(field, value)),
        }
    }

    fn data_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn id_value(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn id_to_string(id: &i64) -> String {
        id.to_string()
    }

    fn assign_generated_id(&mut self, rowid: i64) {
        self.id = Some(rowid);
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let team = Team {
            id: Some(row.get("team_id")?),
            name: row.get("name")?,
            members: Fetched::NotLoaded,
            audit: read_audit(row, "")?,
        };
        team.validate()?;
        Ok(team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Id,
    CreatedAt,
    LastModifiedAt,
}

impl Field for ItemField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "i.item_id",
            Self::CreatedAt => "i.created_at",
            Self::LastModifiedAt => "i.last_modified_at",
        }
    }

    fn column_name(self) -> &'static str {
        match self {
            Self::Id => "item_id",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::LastModifiedAt => "last_modified_at",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Id, Self::CreatedAt, Self::LastModifiedAt]
    }

    fn is_writable(self) -> bool {
        false
    }
}

impl Entity for Item {
    type Field = ItemField;

    const NAME: &'static str = "Item";
    const TABLE: &'static str = "item";
    const ALIAS: &'static str = "i";
    const ID_COLUMN: &'static str = "item_id";
    const GENERATED_ID: bool = false;
    const DATA_COLUMNS: &'static [&'static str] = &[];

    /// The id is client-assigned, so only a missing creation stamp marks a
    /// new item.
    fn is_new(&self) -> bool {
        !self.audit.is_persisted()
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        Item::validate(self)
    }

    fn data_values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn id_value(id: &String) -> Value {
        Value::Text(id.clone())
    }

    fn id_to_string(id: &String) -> String {
        id.clone()
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let item = Item {
            id: row.get("item_id")?,
            audit: read_audit(row, "")?,
        };
        item.validate()?;
        Ok(item)
    }
}
