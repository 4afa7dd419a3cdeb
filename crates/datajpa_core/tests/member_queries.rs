use datajpa_core::db::open_db_in_memory;
use datajpa_core::{
    CrudRepository, Member, MemberDto, MemberField, MemberQueryRepository, MemberRepository,
    MemberRepositoryCustom, MemberSpec, Query, QueryParams, RepoError, SpecificationExecutor,
    SqliteMemberRepository, SqliteTeamRepository, Team,
};
use rusqlite::Connection;

fn seed(conn: &Connection) -> (Team, Team) {
    let teams = SqliteTeamRepository::try_new(conn).unwrap();
    let members = SqliteMemberRepository::try_new(conn).unwrap();

    let team_a = teams.save(Team::new("teamA")).unwrap();
    let team_b = teams.save(Team::new("teamB")).unwrap();
    members
        .save(Member::with_team("member1", 10, &team_a).unwrap())
        .unwrap();
    members
        .save(Member::with_team("member2", 20, &team_b).unwrap())
        .unwrap();
    members.save(Member::with_age("loner", 30)).unwrap();
    (team_a, team_b)
}

fn usernames(members: &[Member]) -> Vec<&str> {
    members.iter().map(|member| member.username.as_str()).collect()
}

#[test]
fn username_and_age_greater_than_returns_exact_subset() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    for (name, age) in [("AAA", 10), ("AAA", 20), ("BBB", 20)] {
        repo.save(Member::with_age(name, age)).unwrap();
    }

    let found = repo
        .find_by_username_and_age_greater_than("AAA", 15)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "AAA");
    assert_eq!(found[0].age, 20);
}

#[test]
fn named_queries_bind_parameters() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    assert_eq!(usernames(&repo.find_by_username("member1").unwrap()), ["member1"]);
    assert_eq!(usernames(&repo.find_user("member2", 20).unwrap()), ["member2"]);
    assert!(repo.find_user("member2", 21).unwrap().is_empty());

    let names = vec!["member1".to_string(), "loner".to_string()];
    assert_eq!(usernames(&repo.find_by_names(&names).unwrap()), ["member1", "loner"]);
    assert!(repo.find_by_names(&[]).unwrap().is_empty());
}

#[test]
fn custom_named_queries_can_be_registered() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mut repo = SqliteMemberRepository::try_new(&conn).unwrap();

    repo.register_named_query(
        "Member.findByTeamName",
        "select m from Member m where m.team.name = :name and m.age >= :age",
    )
    .unwrap();
    let found = repo
        .find_by_named_query(
            "Member.findByTeamName",
            &QueryParams::new().set("name", "teamB".to_string()).set("age", 18),
        )
        .unwrap();
    assert_eq!(usernames(&found), ["member2"]);

    let err = repo
        .find_by_named_query("Member.findByTeamName", &QueryParams::new())
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidQuery(_)));
    let err = repo
        .register_named_query("broken", "select m from Member m where m.nickname = :n")
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidQuery(_)));
}

#[test]
fn projections_read_only_the_requested_columns() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    assert_eq!(
        repo.find_username_list().unwrap(),
        vec!["member1", "member2", "loner"]
    );

    let projected = repo.find_projections_by_username("member1").unwrap();
    assert_eq!(projected.len(), 1);
    assert_eq!(projected[0].username, "member110");
}

#[test]
fn member_dtos_skip_members_without_team() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let dtos = repo.find_member_dtos().unwrap();
    let flattened: Vec<(&str, &str)> = dtos
        .iter()
        .map(|dto| (dto.username.as_str(), dto.team_name.as_str()))
        .collect();
    assert_eq!(flattened, vec![("member1", "teamA"), ("member2", "teamB")]);
}

#[test]
fn return_shapes_follow_row_count() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save(Member::with_age("twin", 1)).unwrap();
    repo.save(Member::with_age("twin", 2)).unwrap();

    assert!(repo.find_list_by_username("missing").unwrap().is_empty());
    assert_eq!(repo.find_optional_by_username("missing").unwrap(), None);
    assert!(matches!(
        repo.find_member_by_username("missing").unwrap_err(),
        RepoError::EmptyResult("Member")
    ));

    assert_eq!(
        repo.find_member_by_username("member1").unwrap().username,
        "member1"
    );

    assert_eq!(repo.find_list_by_username("twin").unwrap().len(), 2);
    assert!(matches!(
        repo.find_optional_by_username("twin").unwrap_err(),
        RepoError::NonUniqueResult { count: 2, .. }
    ));
    assert!(matches!(
        repo.find_member_by_username("twin").unwrap_err(),
        RepoError::NonUniqueResult { count: 2, .. }
    ));
}

#[test]
fn non_unique_count_respects_query_window() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    for age in [1, 2, 3, 4] {
        repo.save(Member::with_age("twin", age)).unwrap();
    }

    let skip_one = Query::new(MemberSpec::username("twin")).offset(1);
    assert!(matches!(
        repo.find_optional(&skip_one).unwrap_err(),
        RepoError::NonUniqueResult { count: 3, .. }
    ));

    let two_of_rest = Query::new(MemberSpec::username("twin")).offset(1).limit(2);
    assert!(matches!(
        repo.find_optional(&two_of_rest).unwrap_err(),
        RepoError::NonUniqueResult { count: 2, .. }
    ));

    let last_only = Query::new(MemberSpec::username("twin")).offset(3);
    assert_eq!(repo.find_optional(&last_only).unwrap().unwrap().username, "twin");

    let one_row = Query::new(MemberSpec::username("twin")).limit(1);
    assert!(repo.find_optional(&one_row).unwrap().is_some());
}

#[test]
fn plain_reads_leave_team_unloaded() {
    let conn = open_db_in_memory().unwrap();
    let (team_a, _) = seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let member = repo.find_member_by_username("member1").unwrap();
    let team = member.team.as_ref().unwrap();
    assert!(!team.is_loaded());
    assert_eq!(Some(*team.id()), team_a.id);
    assert!(team.get().is_none());
}

#[test]
fn fetch_join_loads_team_in_one_query() {
    let conn = open_db_in_memory().unwrap();
    let (team_a, team_b) = seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let members = repo.find_member_fetch_join().unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[0].team.as_ref().unwrap().get(), Some(&team_a));
    assert_eq!(members[1].team.as_ref().unwrap().get(), Some(&team_b));
    assert!(members[2].team.is_none());

    let graph = repo.find_entity_graph_by_username("member2").unwrap();
    assert_eq!(graph.len(), 1);
    let team = graph[0].team.as_ref().unwrap().get().unwrap();
    assert_eq!(team.name, "teamB");
    assert!(!team.members.is_loaded());
}

#[test]
fn fetched_member_equals_plain_member() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let plain = repo.find_member_by_username("member1").unwrap();
    let fetched = repo.find_entity_graph_by_username("member1").unwrap();
    assert_eq!(fetched, vec![plain]);
}

#[test]
fn read_only_lookup_wraps_member() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let member = repo.find_read_only_by_username("member1").unwrap().unwrap();
    assert_eq!(member.username, "member1");
    assert_eq!(member.age, 10);
    assert!(repo.find_read_only_by_username("missing").unwrap().is_none());
}

#[test]
fn custom_fragment_matches_builder_queries() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    let hand_written = MemberQueryRepository::try_new(&conn).unwrap();

    assert_eq!(repo.find_member_custom().unwrap(), repo.find_all().unwrap());
    assert_eq!(hand_written.find_all_members().unwrap(), repo.find_all().unwrap());
}

#[test]
fn hand_written_page_matches_builder_page() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    for name in ["m1", "m2", "m3", "m4", "m5"] {
        repo.save(Member::with_age(name, 10)).unwrap();
    }
    repo.save(Member::with_age("other", 11)).unwrap();
    let hand_written = MemberQueryRepository::try_new(&conn).unwrap();

    let request = datajpa_core::PageRequest::of_sorted(
        0,
        3,
        datajpa_core::Sort::desc(MemberField::Username),
    );
    let page = repo.find_by_age(10, &request).unwrap();
    let rows = hand_written.find_by_page(10, 0, 3).unwrap();

    assert_eq!(usernames(&rows), ["m5", "m4", "m3"]);
    assert_eq!(rows, page.content);
    assert_eq!(hand_written.total_count(10).unwrap(), page.total_elements);
    assert_eq!(
        usernames(&hand_written.find_by_page(10, 3, 3).unwrap()),
        ["m2", "m1"]
    );
}

#[test]
fn dto_page_keeps_metadata() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let page = repo
        .find_by_age(10, &datajpa_core::PageRequest::of(0, 2))
        .unwrap();
    let dto_page = page.clone().map(|member| MemberDto {
        id: member.id.unwrap(),
        username: member.username,
        team_name: "n/a".to_string(),
    });
    assert_eq!(dto_page.total_elements, page.total_elements);
    assert_eq!(dto_page.number_of_elements(), 1);
    assert_eq!(dto_page.content[0].username, "member1");
}
