//! Start-up sample data.

use crate::config::SeedConfig;
use crate::db::errors::Result;
use crate::db::models::members::MemberCreateDBRequest;
use crate::store::Store;
use crate::types::Actor;
use tracing::{info, instrument};

/// Insert `config.count` members named `{prefix}{i}` with age `i`.
///
/// Only runs against an empty store, so restarting against a persistent database never
/// duplicates the sample rows. The rows go in as one atomic batch: a failed run leaves the store
/// empty and the next start seeds it in full. Returns the number of members inserted.
#[instrument(skip(store, config), fields(backend = store.backend(), count = config.count), err)]
pub async fn seed_members(store: &dyn Store, config: &SeedConfig) -> Result<usize> {
    let existing = store.count_members().await?;
    if existing > 0 {
        info!(existing, "Store already holds members, skipping seed");
        return Ok(0);
    }

    let requests: Vec<_> = (0..config.count)
        .map(|i| MemberCreateDBRequest::new(format!("{}{}", config.prefix, i), i32::try_from(i).unwrap_or(i32::MAX)))
        .collect();
    if requests.is_empty() {
        return Ok(0);
    }

    let created = store.create_members(&Actor::new(config.actor.clone()), &requests).await?;

    info!(inserted = created.len(), "Seeded sample members");
    Ok(created.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::members::MemberSortField;
    use crate::api::models::pagination::Order;
    use crate::api::models::teams::TeamSortField;
    use crate::db::errors::DbError;
    use crate::db::models::members::{MemberDBResponse, MemberUpdateDBRequest};
    use crate::db::models::teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest};
    use crate::store::InMemoryStore;
    use crate::types::{MemberId, TeamId, TeamLoading};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// An in-memory store whose first batch insert fails as if the connection dropped.
    struct FailsFirstBatch {
        inner: InMemoryStore,
        failed: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Store for FailsFirstBatch {
        fn backend(&self) -> &'static str {
            "flaky"
        }

        async fn page_members(&self, offset: i64, limit: i64, order: &[Order<MemberSortField>]) -> Result<Vec<MemberDBResponse>> {
            self.inner.page_members(offset, limit, order).await
        }

        async fn count_members(&self) -> Result<i64> {
            self.inner.count_members().await
        }

        async fn get_member(&self, id: MemberId, team_loading: TeamLoading) -> Result<Option<MemberDBResponse>> {
            self.inner.get_member(id, team_loading).await
        }

        async fn create_member(&self, actor: &Actor, request: &MemberCreateDBRequest) -> Result<MemberDBResponse> {
            self.inner.create_member(actor, request).await
        }

        async fn create_members(&self, actor: &Actor, requests: &[MemberCreateDBRequest]) -> Result<Vec<MemberDBResponse>> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(DbError::Unavailable("connection reset".to_string()));
            }
            self.inner.create_members(actor, requests).await
        }

        async fn update_member(&self, actor: &Actor, id: MemberId, request: &MemberUpdateDBRequest) -> Result<MemberDBResponse> {
            self.inner.update_member(actor, id, request).await
        }

        async fn delete_member(&self, id: MemberId) -> Result<bool> {
            self.inner.delete_member(id).await
        }

        async fn page_teams(&self, offset: i64, limit: i64, order: &[Order<TeamSortField>]) -> Result<Vec<TeamDBResponse>> {
            self.inner.page_teams(offset, limit, order).await
        }

        async fn count_teams(&self) -> Result<i64> {
            self.inner.count_teams().await
        }

        async fn get_team(&self, id: TeamId) -> Result<Option<TeamDBResponse>> {
            self.inner.get_team(id).await
        }

        async fn create_team(&self, actor: &Actor, request: &TeamCreateDBRequest) -> Result<TeamDBResponse> {
            self.inner.create_team(actor, request).await
        }

        async fn update_team(&self, actor: &Actor, id: TeamId, request: &TeamUpdateDBRequest) -> Result<TeamDBResponse> {
            self.inner.update_team(actor, id, request).await
        }

        async fn delete_team(&self, id: TeamId) -> Result<bool> {
            self.inner.delete_team(id).await
        }

        async fn member_ids(&self, team_id: TeamId) -> Result<Vec<MemberId>> {
            self.inner.member_ids(team_id).await
        }
    }

    fn config(count: u32) -> SeedConfig {
        SeedConfig {
            count,
            ..SeedConfig::default()
        }
    }

    #[tokio::test]
    async fn test_seed_inserts_named_members() {
        let store = InMemoryStore::new();

        let inserted = seed_members(&store, &config(3)).await.unwrap();
        assert_eq!(inserted, 3);

        let members = store.page_members(0, 10, &[Order::asc(MemberSortField::Id)]).await.unwrap();
        let rows: Vec<_> = members.iter().map(|m| (m.username.as_str(), m.age)).collect();
        assert_eq!(rows, vec![("username0", 0), ("username1", 1), ("username2", 2)]);
        assert!(members.iter().all(|m| m.audit.created_by == "system"));
    }

    #[tokio::test]
    async fn test_seeding_twice_inserts_once() {
        let store = InMemoryStore::new();

        assert_eq!(seed_members(&store, &config(100)).await.unwrap(), 100);
        assert_eq!(seed_members(&store, &config(100)).await.unwrap(), 0);
        assert_eq!(store.count_members().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_zero_count_is_noop() {
        let store = InMemoryStore::new();
        assert_eq!(seed_members(&store, &config(0)).await.unwrap(), 0);
        assert_eq!(store.count_members().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_seed_is_retried_in_full() {
        let store = FailsFirstBatch {
            inner: InMemoryStore::new(),
            failed: AtomicBool::new(false),
        };

        assert!(matches!(seed_members(&store, &config(10)).await, Err(DbError::Unavailable(_))));
        assert_eq!(store.count_members().await.unwrap(), 0);

        assert_eq!(seed_members(&store, &config(10)).await.unwrap(), 10);
        assert_eq!(store.count_members().await.unwrap(), 10);
    }
}
