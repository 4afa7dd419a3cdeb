//! Repository layer: generic CRUD plus entity-specific query methods.
//!
//! # Responsibility
//! - Map entities to their tables and back.
//! - Execute specifications, pages and bulk statements against SQLite.
//! - Translate storage failures into semantic errors.
//!
//! # Invariants
//! - Writes validate the entity before any SQL runs.
//! - Reads reject persisted rows that fail validation instead of masking them.
//! - Repositories refuse connections that are not fully migrated.

use crate::db::DbError;
use crate::model::ModelValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod crud;
pub mod entity;
pub mod item_repo;
pub mod member_query_repo;
pub mod member_repo;
pub mod team_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: String,
    },
    /// Duplicate key, dangling foreign key or failed CHECK; never retried.
    ConstraintViolation(String),
    /// A single-result query matched more than one row.
    NonUniqueResult {
        entity: &'static str,
        count: u64,
    },
    /// A single-result query matched nothing.
    EmptyResult(&'static str),
    InvalidQuery(String),
    InvalidPageRequest(String),
    /// A pessimistic lock was requested outside a session.
    LockRequiresTransaction,
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::NonUniqueResult { entity, count } => {
                write!(f, "expected at most one {entity}, found {count}")
            }
            Self::EmptyResult(entity) => write!(f, "expected exactly one {entity}, found none"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidPageRequest(message) => write!(f, "invalid page request: {message}"),
            Self::LockRequiresTransaction => {
                write!(f, "pessimistic locks require an open session")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Whether the failure came from another connection holding a lock past
    /// the busy timeout.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)))
                if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }
}
