//! Audit timestamps embedded in every entity.
//!
//! # Invariants
//! - `created_at` is written once, on insert, and never changes afterwards.
//! - `last_modified_at` is written on every mutating save and never moves
//!   backwards, even if the wall clock does.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Creation/modification timestamps in Unix epoch milliseconds.
///
/// Both fields are `None` until the owning entity is first persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_at: Option<i64>,
    pub last_modified_at: Option<i64>,
}

impl AuditFields {
    /// Stamps both fields for a first insert.
    ///
    /// Keeps an existing `created_at` untouched.
    pub fn mark_created(&mut self, now_ms: i64) {
        if self.created_at.is_none() {
            self.created_at = Some(now_ms);
        }
        self.mark_modified(now_ms);
    }

    /// Stamps `last_modified_at`, clamped so it never precedes earlier stamps.
    pub fn mark_modified(&mut self, now_ms: i64) {
        let floor = self
            .last_modified_at
            .into_iter()
            .chain(self.created_at)
            .max()
            .unwrap_or(now_ms);
        self.last_modified_at = Some(now_ms.max(floor));
    }

    /// Returns whether the entity has ever been persisted.
    pub fn is_persisted(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
