//! Hand-written member queries.
//!
//! Read-side queries kept apart from the command-side repository; plain SQL,
//! no specification compilation.

use crate::model::member::Member;
use crate::repo::crud::ensure_connection_ready;
use crate::repo::entity::{select_list, Entity};
use crate::repo::RepoResult;
use rusqlite::{params, Connection};

pub struct MemberQueryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MemberQueryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub fn find_all_members(&self) -> RepoResult<Vec<Member>> {
        self.collect(
            &format!(
                "SELECT {} FROM member m ORDER BY m.member_id ASC;",
                select_list::<Member>()
            ),
            params![],
        )
    }

    /// Members of exactly `age`, newest usernames first, windowed by
    /// `offset`/`limit`.
    pub fn find_by_page(&self, age: i32, offset: u32, limit: u32) -> RepoResult<Vec<Member>> {
        self.collect(
            &format!(
                "SELECT {}
                 FROM member m
                 WHERE m.age = ?1
                 ORDER BY m.username DESC, m.member_id ASC
                 LIMIT ?2 OFFSET ?3;",
                select_list::<Member>()
            ),
            params![age, limit, offset],
        )
    }

    pub fn total_count(&self, age: i32) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM member WHERE age = ?1;",
            [age],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }

    fn collect(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(Member::from_row(row)?);
        }
        Ok(members)
    }
}
