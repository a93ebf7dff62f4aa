//! Database models for teams.

use crate::api::models::teams::{TeamCreate, TeamUpdate};
use crate::audit::AuditStamp;
use crate::types::TeamId;

/// Database request for creating a new team
#[derive(Debug, Clone)]
pub struct TeamCreateDBRequest {
    pub name: String,
}

impl TeamCreateDBRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<TeamCreate> for TeamCreateDBRequest {
    fn from(api: TeamCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
        }
    }
}

/// Database request for updating a team
#[derive(Debug, Clone, Default)]
pub struct TeamUpdateDBRequest {
    pub name: Option<String>,
}

impl From<TeamUpdate> for TeamUpdateDBRequest {
    fn from(api: TeamUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
        }
    }
}

/// Database response for a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDBResponse {
    pub id: TeamId,
    pub name: String,
    pub audit: AuditStamp,
}
