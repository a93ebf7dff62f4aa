//! PostgreSQL store backed by a SQLx pool.
//!
//! Reads acquire a pooled connection per call, so the content and count queries of a page can
//! run on two connections at once. Writes run in their own transaction.

use super::Store;
use crate::api::models::members::MemberSortField;
use crate::api::models::pagination::Order;
use crate::api::models::teams::TeamSortField;
use crate::db::errors::{DbError, Result};
use crate::db::handlers::{Members, Repository, Teams, members::MemberFilter, teams::TeamFilter};
use crate::db::models::{
    members::{MemberCreateDBRequest, MemberDBResponse, MemberUpdateDBRequest},
    teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest},
};
use crate::types::{Actor, MemberId, TeamId, TeamLoading};
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn page_members(&self, offset: i64, limit: i64, order: &[Order<MemberSortField>]) -> Result<Vec<MemberDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        let filter = MemberFilter {
            order: order.to_vec(),
            ..MemberFilter::new(offset, limit)
        };
        Members::new(&mut conn).list(&filter).await
    }

    async fn count_members(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Members::new(&mut conn).count(&MemberFilter::new(0, 0)).await
    }

    async fn get_member(&self, id: MemberId, team_loading: TeamLoading) -> Result<Option<MemberDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Members::new(&mut conn).find_with_team(id, team_loading).await
    }

    async fn create_member(&self, actor: &Actor, request: &MemberCreateDBRequest) -> Result<MemberDBResponse> {
        let mut tx = self.pool.begin().await?;
        let member = Members::new(&mut tx).create(actor, request).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn create_members(&self, actor: &Actor, requests: &[MemberCreateDBRequest]) -> Result<Vec<MemberDBResponse>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(requests.len());
        {
            let mut members = Members::new(&mut tx);
            for request in requests {
                created.push(members.create(actor, request).await?);
            }
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn update_member(&self, actor: &Actor, id: MemberId, request: &MemberUpdateDBRequest) -> Result<MemberDBResponse> {
        let mut tx = self.pool.begin().await?;
        let member = Members::new(&mut tx).update(actor, id, request).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn delete_member(&self, id: MemberId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Members::new(&mut conn).delete(id).await
    }

    async fn page_teams(&self, offset: i64, limit: i64, order: &[Order<TeamSortField>]) -> Result<Vec<TeamDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        let filter = TeamFilter::new(offset, limit).with_order(order.to_vec());
        Teams::new(&mut conn).list(&filter).await
    }

    async fn count_teams(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Teams::new(&mut conn).count(&TeamFilter::new(0, 0)).await
    }

    async fn get_team(&self, id: TeamId) -> Result<Option<TeamDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Teams::new(&mut conn).get_by_id(id).await
    }

    async fn create_team(&self, actor: &Actor, request: &TeamCreateDBRequest) -> Result<TeamDBResponse> {
        let mut tx = self.pool.begin().await?;
        let team = Teams::new(&mut tx).create(actor, request).await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn update_team(&self, actor: &Actor, id: TeamId, request: &TeamUpdateDBRequest) -> Result<TeamDBResponse> {
        let mut tx = self.pool.begin().await?;
        let team = Teams::new(&mut tx).update(actor, id, request).await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn delete_team(&self, id: TeamId) -> Result<bool> {
        // Members are detached by ON DELETE SET NULL in the same transaction
        let mut tx = self.pool.begin().await?;
        let deleted = Teams::new(&mut tx).delete(id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn member_ids(&self, team_id: TeamId) -> Result<Vec<MemberId>> {
        let mut conn = self.pool.acquire().await?;
        let mut teams = Teams::new(&mut conn);
        if teams.get_by_id(team_id).await?.is_none() {
            return Err(DbError::NotFound);
        }
        teams.member_ids(team_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[test_log::test]
    async fn test_page_and_count(pool: PgPool) {
        let store = PostgresStore::new(pool);
        let actor = Actor::new("tester");
        for name in ["memberC", "memberA", "memberB"] {
            store.create_member(&actor, &MemberCreateDBRequest::new(name, 1)).await.unwrap();
        }

        let order = vec![Order::desc(MemberSortField::Username), Order::asc(MemberSortField::Id)];
        let page = store.page_members(0, 2, &order).await.unwrap();
        let names: Vec<_> = page.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, vec!["memberC", "memberB"]);
        assert_eq!(store.count_members().await.unwrap(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_username_sort_is_byte_order(pool: PgPool) {
        let store = PostgresStore::new(pool);
        let actor = Actor::new("tester");
        for name in ["carol", "alice", "Bob", "Émile"] {
            store.create_member(&actor, &MemberCreateDBRequest::new(name, 1)).await.unwrap();
        }

        let page = store.page_members(0, 10, &[Order::asc(MemberSortField::Username)]).await.unwrap();
        let names: Vec<_> = page.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, vec!["Bob", "alice", "carol", "Émile"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_members_rolls_back_on_failure(pool: PgPool) {
        let store = PostgresStore::new(pool);
        let actor = Actor::new("seed");
        let team = store.create_team(&actor, &TeamCreateDBRequest::new("teamA")).await.unwrap();

        let batch = vec![
            MemberCreateDBRequest::new("a", 1).with_team(team.id),
            MemberCreateDBRequest::new("b", 2).with_team(team.id + 100),
        ];
        let result = store.create_members(&actor, &batch).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
        assert_eq!(store.count_members().await.unwrap(), 0);

        let created = store.create_members(&actor, &batch[..1]).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(store.member_ids(team.id).await.unwrap(), vec![created[0].id]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_team_detaches_members(pool: PgPool) {
        let store = PostgresStore::new(pool);
        let actor = Actor::new("tester");
        let team = store.create_team(&actor, &TeamCreateDBRequest::new("teamA")).await.unwrap();
        let member = store
            .create_member(&actor, &MemberCreateDBRequest::new("a", 1).with_team(team.id))
            .await
            .unwrap();

        assert!(store.delete_team(team.id).await.unwrap());
        assert!(!store.delete_team(team.id).await.unwrap());
        let member = store.get_member(member.id, TeamLoading::Lazy).await.unwrap().unwrap();
        assert_eq!(member.team_id, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_member_ids_of_missing_team(pool: PgPool) {
        let store = PostgresStore::new(pool);
        assert!(matches!(store.member_ids(999).await, Err(DbError::NotFound)));
    }
}
