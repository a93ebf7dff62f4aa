//! API request/response models for members.

use super::pagination::SortField;
use crate::api::models::teams::TeamResponse;
use crate::audit::AuditStamp;
use crate::db::models::members::MemberDBResponse;
use crate::types::{MemberId, TeamId};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::{IntoParams, ToSchema};

/// Properties a member listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSortField {
    Id,
    Username,
    Age,
    CreatedAt,
    UpdatedAt,
}

impl SortField for MemberSortField {
    const ID: Self = MemberSortField::Id;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(MemberSortField::Id),
            "username" => Some(MemberSortField::Username),
            "age" => Some(MemberSortField::Age),
            "createdAt" | "created_at" => Some(MemberSortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(MemberSortField::UpdatedAt),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MemberSortField::Id => "id",
            MemberSortField::Username => "username",
            MemberSortField::Age => "age",
            MemberSortField::CreatedAt => "createdAt",
            MemberSortField::UpdatedAt => "updatedAt",
        }
    }

    fn column(self) -> &'static str {
        match self {
            MemberSortField::Id => "m.id",
            // Byte order, matching the in-memory store
            MemberSortField::Username => "m.username COLLATE \"C\"",
            MemberSortField::Age => "m.age",
            MemberSortField::CreatedAt => "m.created_at",
            MemberSortField::UpdatedAt => "m.updated_at",
        }
    }
}

/// Request body for creating a member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberCreate {
    /// Display name (required, must not be blank)
    #[schema(example = "member1")]
    pub username: String,
    #[serde(default)]
    #[schema(example = 10)]
    pub age: i32,
    /// Team to join, if any
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

/// Request body for updating a member. Omitted fields are left unchanged;
/// `teamId: null` removes the member from its team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    pub username: Option<String>,
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub team_id: Option<Option<TeamId>>,
}

/// Lightweight member projection used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub id: MemberId,
    pub username: String,
}

impl From<MemberDBResponse> for MemberResponse {
    fn from(db: MemberDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
        }
    }
}

/// Full member details.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailResponse {
    pub id: MemberId,
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    /// The member's team (only included if `include=team` is specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub team: Option<TeamResponse>,
    pub audit: AuditStamp,
}

impl From<MemberDBResponse> for MemberDetailResponse {
    fn from(db: MemberDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            age: db.age,
            team_id: db.team_id,
            team: db.team.map(TeamResponse::from),
            audit: db.audit,
        }
    }
}

/// Query parameters for fetching a single member
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct GetMemberQuery {
    /// Include related data (only "team" is supported)
    pub include: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: MemberUpdate = serde_json::from_str(r#"{"age": 3}"#).unwrap();
        assert_eq!(update.team_id, None);

        let update: MemberUpdate = serde_json::from_str(r#"{"teamId": null}"#).unwrap();
        assert_eq!(update.team_id, Some(None));

        let update: MemberUpdate = serde_json::from_str(r#"{"teamId": 7}"#).unwrap();
        assert_eq!(update.team_id, Some(Some(7)));

        let leave_team = MemberUpdate {
            team_id: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&leave_team).unwrap(),
            serde_json::json!({ "username": null, "age": null, "teamId": null })
        );
        let unchanged = serde_json::to_value(MemberUpdate::default()).unwrap();
        assert!(unchanged.get("teamId").is_none());
    }

    #[test]
    fn test_sort_field_names_round_trip() {
        for field in [
            MemberSortField::Id,
            MemberSortField::Username,
            MemberSortField::Age,
            MemberSortField::CreatedAt,
            MemberSortField::UpdatedAt,
        ] {
            assert_eq!(MemberSortField::parse(field.name()), Some(field));
        }
        assert_eq!(MemberSortField::parse("created_at"), Some(MemberSortField::CreatedAt));
        assert_eq!(MemberSortField::parse("password"), None);
    }
}
