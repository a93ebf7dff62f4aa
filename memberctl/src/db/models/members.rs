//! Database models for members.

use crate::api::models::members::{MemberCreate, MemberUpdate};
use crate::audit::AuditStamp;
use crate::db::models::teams::TeamDBResponse;
use crate::types::{MemberId, TeamId};
use sqlx::FromRow;

/// Database request for creating a new member
#[derive(Debug, Clone)]
pub struct MemberCreateDBRequest {
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
}

impl MemberCreateDBRequest {
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            username: username.into(),
            age,
            team_id: None,
        }
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

impl From<MemberCreate> for MemberCreateDBRequest {
    fn from(api: MemberCreate) -> Self {
        Self {
            username: api.username.trim().to_string(),
            age: api.age,
            team_id: api.team_id,
        }
    }
}

/// Database request for updating a member
#[derive(Debug, Clone, Default)]
pub struct MemberUpdateDBRequest {
    pub username: Option<String>,
    pub age: Option<i32>,
    /// `Some(None)` clears the team, `None` leaves it unchanged
    pub team_id: Option<Option<TeamId>>,
}

impl From<MemberUpdate> for MemberUpdateDBRequest {
    fn from(api: MemberUpdate) -> Self {
        Self {
            username: api.username.map(|u| u.trim().to_string()),
            age: api.age,
            team_id: api.team_id,
        }
    }
}

/// Database response for a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDBResponse {
    pub id: MemberId,
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    /// Populated only when the team was loaded eagerly
    pub team: Option<TeamDBResponse>,
    pub audit: AuditStamp,
}

/// Join projection: a member with its team's name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MemberSummary {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}
