use datajpa_core::db::open_db_with_config;
use datajpa_core::{
    CrudRepository, LockMode, Member, MemberRepository, PersistenceConfig, Session,
    SqliteMemberRepository,
};
use rusqlite::Connection;
use std::path::Path;

fn short_timeout() -> PersistenceConfig {
    PersistenceConfig {
        busy_timeout_ms: 100,
        ..PersistenceConfig::default()
    }
}

fn open_pair(path: &Path) -> (Connection, Connection) {
    let first = open_db_with_config(path, &short_timeout()).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&first).unwrap();
        repo.save(Member::with_age("m1", 30)).unwrap();
    }
    let second = open_db_with_config(path, &short_timeout()).unwrap();
    (first, second)
}

#[test]
fn pessimistic_read_blocks_other_writers_until_commit() {
    let dir = tempfile::tempdir().unwrap();
    let (mut first, second) = open_pair(&dir.path().join("read-lock.db"));
    let other = SqliteMemberRepository::try_new(&second).unwrap();

    let session = Session::begin(&mut first).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        let locked = repo
            .find_lock_by_username("m1", LockMode::PessimisticRead)
            .unwrap();
        assert_eq!(locked.len(), 1);

        assert_eq!(other.find_all().unwrap().len(), 1);
        let err = other.bulk_age_plus(0).unwrap_err();
        assert!(err.is_lock_timeout(), "unexpected error: {err}");
    }
    session.commit().unwrap();

    assert_eq!(other.bulk_age_plus(0).unwrap(), 1);
}

#[test]
fn pessimistic_write_blocks_other_writers_but_not_readers() {
    let dir = tempfile::tempdir().unwrap();
    let (mut first, second) = open_pair(&dir.path().join("write-lock.db"));
    let other = SqliteMemberRepository::try_new(&second).unwrap();

    let session = Session::begin(&mut first).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        let mut locked = repo
            .find_lock_by_username("m1", LockMode::PessimisticWrite)
            .unwrap();

        let err = other.save(Member::with_age("intruder", 1)).unwrap_err();
        assert!(err.is_lock_timeout(), "unexpected error: {err}");
        assert_eq!(other.find_member_by_username("m1").unwrap().age, 30);

        let mut member = locked.remove(0);
        member.age = 31;
        repo.save(member).unwrap();
    }
    session.commit().unwrap();

    assert_eq!(other.find_member_by_username("m1").unwrap().age, 31);
    other.save(Member::with_age("late", 1)).unwrap();
    assert_eq!(other.count().unwrap(), 2);
}

#[test]
fn rolled_back_session_releases_locks_and_changes() {
    let dir = tempfile::tempdir().unwrap();
    let (mut first, second) = open_pair(&dir.path().join("rollback.db"));
    let other = SqliteMemberRepository::try_new(&second).unwrap();

    let session = Session::begin_immediate(&mut first).unwrap();
    {
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        repo.bulk_age_plus(0).unwrap();
        assert!(other.bulk_age_plus(0).unwrap_err().is_lock_timeout());
    }
    session.rollback().unwrap();

    assert_eq!(other.find_member_by_username("m1").unwrap().age, 30);
    assert_eq!(other.bulk_age_plus(0).unwrap(), 1);
}

#[test]
fn dropping_an_uncommitted_session_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let (mut first, second) = open_pair(&dir.path().join("drop.db"));

    {
        let session = Session::begin(&mut first).unwrap();
        let repo = SqliteMemberRepository::try_new(&session).unwrap();
        repo.save(Member::with_age("ghost", 1)).unwrap();
    }

    let other = SqliteMemberRepository::try_new(&second).unwrap();
    assert_eq!(other.count().unwrap(), 1);
}
