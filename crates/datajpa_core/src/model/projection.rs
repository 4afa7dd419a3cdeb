//! Read-only projections of member rows.

use crate::model::member::MemberId;
use serde::{Deserialize, Serialize};

/// Member row flattened with its team name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: String,
}

/// Open projection: `username` concatenated with `age` by the query itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameOnly {
    pub username: String,
}
