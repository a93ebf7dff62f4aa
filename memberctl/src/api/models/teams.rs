//! API request/response models for teams.

use super::pagination::SortField;
use crate::audit::AuditStamp;
use crate::db::models::teams::TeamDBResponse;
use crate::types::{MemberId, TeamId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Properties a team listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSortField {
    Id,
    Name,
    CreatedAt,
}

impl SortField for TeamSortField {
    const ID: Self = TeamSortField::Id;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(TeamSortField::Id),
            "name" => Some(TeamSortField::Name),
            "createdAt" | "created_at" => Some(TeamSortField::CreatedAt),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TeamSortField::Id => "id",
            TeamSortField::Name => "name",
            TeamSortField::CreatedAt => "createdAt",
        }
    }

    fn column(self) -> &'static str {
        match self {
            TeamSortField::Id => "id",
            TeamSortField::Name => "name COLLATE \"C\"",
            TeamSortField::CreatedAt => "created_at",
        }
    }
}

/// Request body for creating a new team.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamCreate {
    /// Display name for the team (must be unique)
    #[schema(example = "teamA")]
    pub name: String,
}

/// Request body for renaming a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TeamUpdate {
    /// New name (null to keep unchanged)
    pub name: Option<String>,
}

/// Team details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub id: TeamId,
    pub name: String,
    pub audit: AuditStamp,
    /// IDs of the team's members (only included if `include=members` is specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<MemberId>>,
}

impl From<TeamDBResponse> for TeamResponse {
    fn from(db: TeamDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            audit: db.audit,
            member_ids: None,
        }
    }
}

impl TeamResponse {
    pub fn with_member_ids(mut self, member_ids: Vec<MemberId>) -> Self {
        self.member_ids = Some(member_ids);
        self
    }
}

/// Query parameters for fetching a single team
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct GetTeamQuery {
    /// Include related data (only "members" is supported)
    pub include: Option<String>,
}
