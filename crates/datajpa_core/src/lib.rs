//! Typed repository layer over SQLite.
//!
//! Entities (`Member`, `Team`, `Item`) are persisted through generic CRUD
//! repositories, queried with composable specifications, named queries and
//! page requests, and grouped into units of work with [`Session`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{ConfigError, PersistenceConfig};
pub use db::{
    open_db, open_db_in_memory, open_db_in_memory_with_config, open_db_with_config, DbError,
    DbResult, LockMode, Session,
};
pub use logging::{default_log_level, init_logging, init_logging_with_config, logging_status};
pub use model::audit::AuditFields;
pub use model::item::{Item, ItemId};
pub use model::member::{Member, MemberId};
pub use model::projection::{MemberDto, UsernameOnly};
pub use model::relation::{Fetched, Identified, Ref};
pub use model::team::{Team, TeamId};
pub use model::ModelValidationError;
pub use query::{
    ComparisonOp, Direction, Field, FieldUpdate, NamedQueryRegistry, Page, PageRequest, Query,
    QueryParams, ReadOnly, Slice, Sort, Specification, Value,
};
pub use repo::crud::{CrudRepository, SpecificationExecutor, SqliteRepository};
pub use repo::entity::{Entity, ItemField, MemberField, TeamField};
pub use repo::item_repo::SqliteItemRepository;
pub use repo::member_query_repo::MemberQueryRepository;
pub use repo::member_repo::{
    MemberRepository, MemberRepositoryCustom, MemberSpec, SqliteMemberRepository,
};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{RepoError, RepoResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
