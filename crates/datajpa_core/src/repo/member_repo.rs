//! Member repository: CRUD plus the member query catalogue.
//!
//! # Responsibility
//! - Expose the member lookups callers need as named methods.
//! - Load the team relation only when a method asks for it (fetch join).
//!
//! # Invariants
//! - Single-result methods fail when more than one row matches.
//! - Bulk methods leave previously loaded members stale.

use crate::db::LockMode;
use crate::model::member::Member;
use crate::model::projection::{MemberDto, UsernameOnly};
use crate::model::relation::{Fetched, Ref};
use crate::model::team::Team;
use crate::query::{
    FieldUpdate, NamedQueryRegistry, Page, PageRequest, Query, QueryParams, ReadOnly, Slice,
    Sort, Specification,
};
use crate::repo::crud::{CrudRepository, SpecificationExecutor, SqliteRepository};
use crate::repo::entity::{read_audit, select_list, Entity, MemberField, MEMBER_TEAM_JOIN};
use crate::repo::member_query_repo::MemberQueryRepository;
use crate::repo::RepoResult;
use rusqlite::{Connection, Row};

pub const FIND_BY_USERNAME: &str = "Member.findByUsername";
pub const FIND_USER: &str = "Member.findUser";
pub const FIND_BY_NAMES: &str = "Member.findByNames";

const BUILTIN_QUERIES: &[(&str, &str)] = &[
    (
        FIND_BY_USERNAME,
        "select m from Member m where m.username = :username",
    ),
    (
        FIND_USER,
        "select m from Member m where m.username = :username and m.age = :age",
    ),
    (
        FIND_BY_NAMES,
        "select m from Member m where m.username in :names",
    ),
];

const TEAM_COLUMNS: &str = "t.team_id AS t_team_id, t.name AS t_name, \
     t.created_at AS t_created_at, t.last_modified_at AS t_last_modified_at";

/// Canned member specifications.
pub struct MemberSpec;

impl MemberSpec {
    pub fn username(username: impl Into<String>) -> Specification<MemberField> {
        Specification::equal(MemberField::Username, username.into())
    }

    pub fn team_name(name: impl Into<String>) -> Specification<MemberField> {
        Specification::equal(MemberField::TeamName, name.into())
    }

    pub fn age_greater_than(age: i32) -> Specification<MemberField> {
        Specification::greater_than(MemberField::Age, age)
    }

    pub fn age_at_least(age: i32) -> Specification<MemberField> {
        Specification::greater_or_equal(MemberField::Age, age)
    }
}

/// Hand-written query fragment mixed into the member repository.
pub trait MemberRepositoryCustom {
    fn find_member_custom(&self) -> RepoResult<Vec<Member>>;
}

pub trait MemberRepository:
    CrudRepository<Member> + SpecificationExecutor<Member> + MemberRepositoryCustom
{
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>>;
    /// Runs the `Member.findByUsername` named query.
    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Runs the `Member.findUser` named query.
    fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>>;
    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>>;
    fn find_username_list(&self) -> RepoResult<Vec<String>>;
    /// Members that belong to a team, flattened with the team name.
    fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>>;
    fn find_projections_by_username(&self, username: &str) -> RepoResult<Vec<UsernameOnly>>;
    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Exactly one member with `username`.
    fn find_member_by_username(&self, username: &str) -> RepoResult<Member>;
    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    fn find_by_age(&self, age: i32, request: &PageRequest<MemberField>)
        -> RepoResult<Page<Member>>;
    fn find_slice_by_age(
        &self,
        age: i32,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Member>>;
    /// Adds one year to every member aged `age` or older; returns rows changed.
    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize>;
    /// All members with their team loaded in the same statement.
    fn find_member_fetch_join(&self) -> RepoResult<Vec<Member>>;
    fn find_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    fn find_read_only_by_username(&self, username: &str)
        -> RepoResult<Option<ReadOnly<Member>>>;
    /// Loads members under `mode`; locking modes need an open session.
    fn find_lock_by_username(&self, username: &str, mode: LockMode) -> RepoResult<Vec<Member>>;
}

pub struct SqliteMemberRepository<'conn> {
    base: SqliteRepository<'conn, Member>,
    named: NamedQueryRegistry<MemberField>,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Builds the repository and parses its built-in named queries.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let base = SqliteRepository::try_new(conn)?;
        let mut named = NamedQueryRegistry::new(Member::NAME);
        for (name, text) in BUILTIN_QUERIES {
            named.register(*name, text)?;
        }
        Ok(Self { base, named })
    }

    /// Adds or replaces a named query for this repository.
    pub fn register_named_query(&mut self, name: &str, text: &str) -> RepoResult<()> {
        self.named.register(name, text)
    }

    pub fn find_by_named_query(&self, name: &str, params: &QueryParams) -> RepoResult<Vec<Member>> {
        let spec = self.named.bind(name, params)?;
        self.base.find_all_matching(&spec)
    }

    pub fn named_queries(&self) -> &NamedQueryRegistry<MemberField> {
        &self.named
    }

    fn fetch_with_team(&self, query: &Query<MemberField>) -> RepoResult<Vec<Member>> {
        let columns = format!("{}, {TEAM_COLUMNS}", select_list::<Member>());
        self.base
            .find_projected(&columns, &[MEMBER_TEAM_JOIN], query, member_with_team)
    }
}

fn member_with_team(row: &Row<'_>) -> RepoResult<Member> {
    let mut member = Member::from_row(row)?;
    if let Some(team_id) = row.get::<_, Option<i64>>("t_team_id")? {
        let team = Team {
            id: Some(team_id),
            name: row.get("t_name")?,
            members: Fetched::NotLoaded,
            audit: read_audit(row, "t_")?,
        };
        team.validate()?;
        member.team = Ref::loaded(team);
    }
    Ok(member)
}

impl MemberRepositoryCustom for SqliteMemberRepository<'_> {
    fn find_member_custom(&self) -> RepoResult<Vec<Member>> {
        MemberQueryRepository::try_new(self.base.connection())?.find_all_members()
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>> {
        self.base.find_all_matching(
            &MemberSpec::username(username).and(MemberSpec::age_greater_than(age)),
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.find_by_named_query(
            FIND_BY_USERNAME,
            &QueryParams::new().set("username", username.to_string()),
        )
    }

    fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>> {
        self.find_by_named_query(
            FIND_USER,
            &QueryParams::new()
                .set("username", username.to_string())
                .set("age", age),
        )
    }

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>> {
        self.find_by_named_query(
            FIND_BY_NAMES,
            &QueryParams::new().set_list("names", names.iter().cloned()),
        )
    }

    fn find_username_list(&self) -> RepoResult<Vec<String>> {
        self.base.find_projected(
            "m.username",
            &[],
            &Query::new(Specification::all()),
            |row| Ok(row.get(0)?),
        )
    }

    fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>> {
        self.base.find_projected(
            "m.member_id, m.username, t.name AS team_name",
            &[MEMBER_TEAM_JOIN],
            &Query::new(Specification::is_not_null(MemberField::TeamId)),
            |row| {
                Ok(MemberDto {
                    id: row.get("member_id")?,
                    username: row.get("username")?,
                    team_name: row.get("team_name")?,
                })
            },
        )
    }

    fn find_projections_by_username(&self, username: &str) -> RepoResult<Vec<UsernameOnly>> {
        self.base.find_projected(
            "m.username || m.age AS username",
            &[],
            &Query::new(MemberSpec::username(username)),
            |row| {
                Ok(UsernameOnly {
                    username: row.get("username")?,
                })
            },
        )
    }

    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.base.find_all_matching(&MemberSpec::username(username))
    }

    fn find_member_by_username(&self, username: &str) -> RepoResult<Member> {
        self.base
            .find_single(&Query::new(MemberSpec::username(username)))
    }

    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.base
            .find_optional(&Query::new(MemberSpec::username(username)))
    }

    fn find_by_age(
        &self,
        age: i32,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Member>> {
        self.base
            .find_page(&Specification::equal(MemberField::Age, age), request)
    }

    fn find_slice_by_age(
        &self,
        age: i32,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Member>> {
        self.base
            .find_slice(&Specification::equal(MemberField::Age, age), request)
    }

    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize> {
        self.base.bulk_update(
            &MemberSpec::age_at_least(age),
            &[FieldUpdate::Add(MemberField::Age, 1)],
        )
    }

    fn find_member_fetch_join(&self) -> RepoResult<Vec<Member>> {
        self.fetch_with_team(&Query::new(Specification::all()))
    }

    fn find_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.fetch_with_team(&Query::new(MemberSpec::username(username)))
    }

    fn find_read_only_by_username(
        &self,
        username: &str,
    ) -> RepoResult<Option<ReadOnly<Member>>> {
        Ok(self
            .find_optional_by_username(username)?
            .map(ReadOnly::new))
    }

    fn find_lock_by_username(&self, username: &str, mode: LockMode) -> RepoResult<Vec<Member>> {
        self.base
            .find_list(&Query::new(MemberSpec::username(username)).lock(mode))
    }
}

impl CrudRepository<Member> for SqliteMemberRepository<'_> {
    fn save(&self, entity: Member) -> RepoResult<Member> {
        self.base.save(entity)
    }

    fn find_by_id(&self, id: &i64) -> RepoResult<Option<Member>> {
        self.base.find_by_id(id)
    }

    fn exists_by_id(&self, id: &i64) -> RepoResult<bool> {
        self.base.exists_by_id(id)
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.base.find_all()
    }

    fn find_all_sorted(&self, sort: &Sort<MemberField>) -> RepoResult<Vec<Member>> {
        self.base.find_all_sorted(sort)
    }

    fn count(&self) -> RepoResult<u64> {
        self.base.count()
    }

    fn delete(&self, entity: &Member) -> RepoResult<()> {
        self.base.delete(entity)
    }

    fn delete_by_id(&self, id: &i64) -> RepoResult<()> {
        self.base.delete_by_id(id)
    }

    fn refresh(&self, entity: &mut Member) -> RepoResult<()> {
        self.base.refresh(entity)
    }
}

impl SpecificationExecutor<Member> for SqliteMemberRepository<'_> {
    fn find_all_matching(&self, spec: &Specification<MemberField>) -> RepoResult<Vec<Member>> {
        self.base.find_all_matching(spec)
    }

    fn find_list(&self, query: &Query<MemberField>) -> RepoResult<Vec<Member>> {
        self.base.find_list(query)
    }

    fn find_optional(&self, query: &Query<MemberField>) -> RepoResult<Option<Member>> {
        self.base.find_optional(query)
    }

    fn find_single(&self, query: &Query<MemberField>) -> RepoResult<Member> {
        self.base.find_single(query)
    }

    fn count_matching(&self, spec: &Specification<MemberField>) -> RepoResult<u64> {
        self.base.count_matching(spec)
    }

    fn find_page(
        &self,
        spec: &Specification<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Member>> {
        self.base.find_page(spec, request)
    }

    fn find_slice(
        &self,
        spec: &Specification<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Member>> {
        self.base.find_slice(spec, request)
    }

    fn bulk_update(
        &self,
        spec: &Specification<MemberField>,
        updates: &[FieldUpdate<MemberField>],
    ) -> RepoResult<usize> {
        self.base.bulk_update(spec, updates)
    }

    fn bulk_delete(&self, spec: &Specification<MemberField>) -> RepoResult<usize> {
        self.base.bulk_delete(spec)
    }
}
