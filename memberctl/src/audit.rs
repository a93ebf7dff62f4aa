//! Audit metadata for persisted entities.
//!
//! Audit fields are never written by handlers. The store layer calls [`AuditStamp::on_create`]
//! when inserting a row and [`AuditStamp::touch`] when updating it, passing the acting identity
//! explicitly. Both backends go through these functions so the columns are filled the same way.

use crate::types::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Creation and last-modification metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl AuditStamp {
    /// Stamp for a row created by `actor` at `now`.
    pub fn on_create(actor: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor.as_str().to_string(),
            updated_by: actor.as_str().to_string(),
        }
    }

    /// Record a modification. Creation fields are left untouched.
    pub fn touch(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor.as_str().to_string();
    }

    /// Stamp for a new row, using the current time.
    pub fn now(actor: &Actor) -> Self {
        Self::on_create(actor, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_on_create_sets_both_sides() {
        let actor = Actor::new("alice");
        let now = Utc::now();
        let stamp = AuditStamp::on_create(&actor, now);

        assert_eq!(stamp.created_at, now);
        assert_eq!(stamp.updated_at, now);
        assert_eq!(stamp.created_by, "alice");
        assert_eq!(stamp.updated_by, "alice");
    }

    #[test]
    fn test_touch_keeps_creation_fields() {
        let created = Utc::now();
        let mut stamp = AuditStamp::on_create(&Actor::new("alice"), created);

        let later = created + Duration::milliseconds(100);
        stamp.touch(&Actor::new("bob"), later);

        assert_eq!(stamp.created_at, created);
        assert_eq!(stamp.created_by, "alice");
        assert_eq!(stamp.updated_at, later);
        assert_eq!(stamp.updated_by, "bob");
    }
}
