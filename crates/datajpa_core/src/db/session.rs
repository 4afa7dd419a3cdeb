//! Unit-of-work sessions.
//!
//! A [`Session`] is one SQLite transaction. Repositories built on it share
//! one consistency scope: reads observe earlier writes of the same session,
//! and nothing is visible to other connections before [`Session::commit`].
//!
//! # Invariants
//! - Dropping an uncommitted session rolls it back.
//! - A session is confined to the thread that opened it (`Connection` is
//!   not `Sync`).

use super::DbResult;
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::time::Instant;

/// Per-query lock request.
///
/// Locks other than `None` are only meaningful inside a [`Session`]; they are
/// held until the session commits or rolls back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    /// Shared lock: other connections may read, writers wait for commit.
    PessimisticRead,
    /// Reserved lock: other connections may read, no other writer may start.
    PessimisticWrite,
}

pub struct Session<'conn> {
    tx: Transaction<'conn>,
    started_at: Instant,
}

impl<'conn> Session<'conn> {
    /// Opens a deferred transaction; locks are taken on first access.
    pub fn begin(conn: &'conn mut Connection) -> DbResult<Self> {
        Self::begin_with(conn, TransactionBehavior::Deferred, "deferred")
    }

    /// Opens a transaction that holds the write lock from the start.
    pub fn begin_immediate(conn: &'conn mut Connection) -> DbResult<Self> {
        Self::begin_with(conn, TransactionBehavior::Immediate, "immediate")
    }

    fn begin_with(
        conn: &'conn mut Connection,
        behavior: TransactionBehavior,
        label: &str,
    ) -> DbResult<Self> {
        let tx = conn.transaction_with_behavior(behavior)?;
        debug!("event=session_begin module=db behavior={label}");
        Ok(Self {
            tx,
            started_at: Instant::now(),
        })
    }

    pub fn commit(self) -> DbResult<()> {
        let started_at = self.started_at;
        self.tx.commit()?;
        info!(
            "event=session_commit module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn rollback(self) -> DbResult<()> {
        let started_at = self.started_at;
        self.tx.rollback()?;
        info!(
            "event=session_rollback module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.tx
    }
}

impl Deref for Session<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.tx
    }
}
