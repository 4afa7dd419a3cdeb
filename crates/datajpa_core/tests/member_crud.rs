use datajpa_core::db::open_db_in_memory;
use datajpa_core::{
    CrudRepository, Member, MemberField, RepoError, Session, Sort, SqliteMemberRepository,
    SqliteTeamRepository, Team,
};

#[test]
fn save_then_find_by_id_returns_equal_member() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let saved = repo.save(Member::with_age("memberA", 10)).unwrap();
    let id = saved.id.unwrap();

    let loaded = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.username, "memberA");
    assert!(saved.audit.created_at.is_some());
    assert_eq!(saved.audit.created_at, saved.audit.last_modified_at);
}

#[test]
fn save_with_team_keeps_reference() {
    let conn = open_db_in_memory().unwrap();
    let teams = SqliteTeamRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();

    let team = teams.save(Team::new("teamA")).unwrap();
    let saved = members
        .save(Member::with_team("member1", 20, &team).unwrap())
        .unwrap();

    let loaded = members.find_by_id(&saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.team_id(), team.id);
    assert!(!loaded.team.as_ref().unwrap().is_loaded());
}

#[test]
fn member_cannot_reference_unsaved_team() {
    let err = Member::with_team("member1", 20, &Team::new("ghost")).unwrap_err();
    assert!(err.to_string().contains("team"));
}

#[test]
fn update_keeps_created_at_and_advances_last_modified() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut member = repo.save(Member::with_age("before", 10)).unwrap();
    let created_at = member.audit.created_at;
    let first_modified = member.audit.last_modified_at;

    member.username = "after".to_string();
    let updated = repo.save(member).unwrap();

    assert_eq!(updated.audit.created_at, created_at);
    assert!(updated.audit.last_modified_at >= first_modified);
    let loaded = repo.find_by_id(&updated.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.username, "after");
    assert_eq!(loaded.audit, updated.audit);
}

#[test]
fn update_of_vanished_row_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let member = repo.save(Member::with_age("gone", 10)).unwrap();
    repo.delete(&member).unwrap();

    let err = repo.save(member).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "Member", .. }));
}

#[test]
fn count_after_inserts_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let saved = repo
        .save_all(
            ["m1", "m2", "m3", "m4", "m5"]
                .into_iter()
                .map(|name| Member::with_age(name, 10))
                .collect(),
        )
        .unwrap();
    repo.delete(&saved[0]).unwrap();
    repo.delete(&saved[3]).unwrap();

    assert_eq!(repo.count().unwrap(), 3);
    assert_eq!(repo.find_all().unwrap().len(), 3);
    assert!(!repo.exists_by_id(&saved[0].id.unwrap()).unwrap());
    assert!(repo.exists_by_id(&saved[1].id.unwrap()).unwrap());
}

#[test]
fn delete_of_transient_or_missing_member_is_ignored() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    repo.delete(&Member::new("never-saved")).unwrap();
    let saved = repo.save(Member::new("once")).unwrap();
    repo.delete(&saved).unwrap();
    repo.delete(&saved).unwrap();

    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn delete_by_id_reports_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let saved = repo.save(Member::new("m1")).unwrap();
    let id = saved.id.unwrap();
    repo.delete_by_id(&id).unwrap();

    let err = repo.delete_by_id(&id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
    assert!(repo.find_by_id(&id).unwrap().is_none());
}

#[test]
fn find_all_sorted_breaks_ties_by_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    for (name, age) in [("b", 20), ("a", 20), ("c", 10)] {
        repo.save(Member::with_age(name, age)).unwrap();
    }

    let names: Vec<String> = repo
        .find_all_sorted(&Sort::desc(MemberField::Age))
        .unwrap()
        .into_iter()
        .map(|member| member.username)
        .collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}

#[test]
fn invalid_members_are_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.save(Member::new("  ")).unwrap_err(),
        RepoError::Validation(_)
    ));
    assert!(matches!(
        repo.save(Member::with_age("young", -1)).unwrap_err(),
        RepoError::Validation(_)
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn dangling_team_reference_is_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let teams = SqliteTeamRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();

    let team = teams.save(Team::new("short-lived")).unwrap();
    let member = Member::with_team("orphan", 30, &team).unwrap();
    teams.delete(&team).unwrap();

    let err = members.save(member).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)));
}

#[test]
fn session_reads_own_writes_and_rollback_discards_them() {
    let mut conn = open_db_in_memory().unwrap();

    let session = Session::begin(&mut conn).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        let saved = repo.save(Member::with_age("pending", 33)).unwrap();
        assert!(repo.find_by_id(&saved.id.unwrap()).unwrap().is_some());
        assert_eq!(repo.count().unwrap(), 1);
    }
    session.rollback().unwrap();

    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn committed_session_is_visible_afterwards() {
    let mut conn = open_db_in_memory().unwrap();

    let session = Session::begin(&mut conn).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        repo.save(Member::with_age("kept", 33)).unwrap();
    }
    session.commit().unwrap();

    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn refresh_reloads_stale_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut stale = repo.save(Member::with_age("m1", 10)).unwrap();
    let mut fresh = stale.clone();
    fresh.age = 11;
    repo.save(fresh).unwrap();

    repo.refresh(&mut stale).unwrap();
    assert_eq!(stale.age, 11);

    let err = repo.refresh(&mut Member::new("transient")).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
