//! Team repository.
//!
//! Team members are a non-owning back-reference: plain team reads leave them
//! `NotLoaded`, and the `*_with_members` methods load them in one extra
//! statement per call, never one per team.

use crate::model::member::Member;
use crate::model::relation::Fetched;
use crate::model::team::{Team, TeamId};
use crate::query::{
    FieldUpdate, Page, PageRequest, Query, Slice, Sort, Specification, Value,
};
use crate::repo::crud::{CrudRepository, SpecificationExecutor, SqliteRepository};
use crate::repo::entity::{MemberField, TeamField};
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::collections::BTreeMap;

pub trait TeamRepository: CrudRepository<Team> + SpecificationExecutor<Team> {
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Team>>;
    /// Loads one team with its members, each referencing the team unloaded.
    fn find_with_members(&self, id: &TeamId) -> RepoResult<Option<Team>>;
    fn find_all_with_members(&self) -> RepoResult<Vec<Team>>;
}

pub struct SqliteTeamRepository<'conn> {
    base: SqliteRepository<'conn, Team>,
    members: SqliteRepository<'conn, Member>,
}

impl<'conn> SqliteTeamRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            base: SqliteRepository::try_new(conn)?,
            members: SqliteRepository::try_new(conn)?,
        })
    }

    fn attach_members(&self, mut teams: Vec<Team>) -> RepoResult<Vec<Team>> {
        let ids: Vec<Value> = teams
            .iter()
            .filter_map(|team| team.id)
            .map(Value::Integer)
            .collect();
        let mut grouped: BTreeMap<TeamId, Vec<Member>> = BTreeMap::new();
        if !ids.is_empty() {
            let members = self
                .members
                .find_all_matching(&Specification::in_list(MemberField::TeamId, ids))?;
            for member in members {
                if let Some(team_id) = member.team_id() {
                    grouped.entry(team_id).or_default().push(member);
                }
            }
        }
        for team in &mut teams {
            let members = team
                .id
                .and_then(|id| grouped.remove(&id))
                .unwrap_or_default();
            team.members = Fetched::Loaded(members);
        }
        Ok(teams)
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Team>> {
        self.base
            .find_all_matching(&Specification::equal(TeamField::Name, name.to_string()))
    }

    fn find_with_members(&self, id: &TeamId) -> RepoResult<Option<Team>> {
        let Some(team) = self.base.find_by_id(id)? else {
            return Ok(None);
        };
        Ok(self.attach_members(vec![team])?.pop())
    }

    fn find_all_with_members(&self) -> RepoResult<Vec<Team>> {
        let teams = self.base.find_all()?;
        self.attach_members(teams)
    }
}

impl CrudRepository<Team> for SqliteTeamRepository<'_> {
    fn save(&self, entity: Team) -> RepoResult<Team> {
        self.base.save(entity)
    }

    fn find_by_id(&self, id: &TeamId) -> RepoResult<Option<Team>> {
        self.base.find_by_id(id)
    }

    fn exists_by_id(&self, id: &TeamId) -> RepoResult<bool> {
        self.base.exists_by_id(id)
    }

    fn find_all(&self) -> RepoResult<Vec<Team>> {
        self.base.find_all()
    }

    fn find_all_sorted(&self, sort: &Sort<TeamField>) -> RepoResult<Vec<Team>> {
        self.base.find_all_sorted(sort)
    }

    fn count(&self) -> RepoResult<u64> {
        self.base.count()
    }

    fn delete(&self, entity: &Team) -> RepoResult<()> {
        self.base.delete(entity)
    }

    fn delete_by_id(&self, id: &TeamId) -> RepoResult<()> {
        self.base.delete_by_id(id)
    }

    fn refresh(&self, entity: &mut Team) -> RepoResult<()> {
        self.base.refresh(entity)
    }
}

impl SpecificationExecutor<Team> for SqliteTeamRepository<'_> {
    fn find_all_matching(&self, spec: &Specification<TeamField>) -> RepoResult<Vec<Team>> {
        self.base.find_all_matching(spec)
    }

    fn find_list(&self, query: &Query<TeamField>) -> RepoResult<Vec<Team>> {
        self.base.find_list(query)
    }

    fn find_optional(&self, query: &Query<TeamField>) -> RepoResult<Option<Team>> {
        self.base.find_optional(query)
    }

    fn find_single(&self, query: &Query<TeamField>) -> RepoResult<Team> {
        self.base.find_single(query)
    }

    fn count_matching(&self, spec: &Specification<TeamField>) -> RepoResult<u64> {
        self.base.count_matching(spec)
    }

    fn find_page(
        &self,
        spec: &Specification<TeamField>,
        request: &PageRequest<TeamField>,
    ) -> RepoResult<Page<Team>> {
        self.base.find_page(spec, request)
    }

    fn find_slice(
        &self,
        spec: &Specification<TeamField>,
        request: &PageRequest<TeamField>,
    ) -> RepoResult<Slice<Team>> {
        self.base.find_slice(spec, request)
    }

    fn bulk_update(
        &self,
        spec: &Specification<TeamField>,
        updates: &[FieldUpdate<TeamField>],
    ) -> RepoResult<usize> {
        self.base.bulk_update(spec, updates)
    }

    fn bulk_delete(&self, spec: &Specification<TeamField>) -> RepoResult<usize> {
        self.base.bulk_delete(spec)
    }
}
