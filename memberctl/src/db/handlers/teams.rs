//! Database repository for teams.

use crate::api::models::pagination::Order;
use crate::api::models::teams::TeamSortField;
use crate::audit::AuditStamp;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, push_order_by},
    models::teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest},
};
use crate::types::{Actor, MemberId, TeamId};
use chrono::Utc;
use sqlx::{Connection, FromRow, PgConnection, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing teams
#[derive(Debug, Clone)]
pub struct TeamFilter {
    pub skip: i64,
    pub limit: i64,
    pub order: Vec<Order<TeamSortField>>,
}

impl TeamFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            order: vec![Order::asc(TeamSortField::Id)],
        }
    }

    pub fn with_order(mut self, order: Vec<Order<TeamSortField>>) -> Self {
        self.order = order;
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Team {
    pub id: TeamId,
    pub name: String,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

impl From<Team> for TeamDBResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            audit: team.audit,
        }
    }
}

pub struct Teams<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Teams<'c> {
    type CreateRequest = TeamCreateDBRequest;
    type UpdateRequest = TeamUpdateDBRequest;
    type Response = TeamDBResponse;
    type Id = TeamId;
    type Filter = TeamFilter;

    #[instrument(skip(self, request), fields(actor = %actor, name = %request.name), err)]
    async fn create(&mut self, actor: &Actor, request: &Self::CreateRequest) -> Result<Self::Response> {
        let audit = AuditStamp::now(actor);

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, created_at, updated_at, created_by, updated_by
            "#,
        )
        .bind(&request.name)
        .bind(audit.created_at)
        .bind(audit.updated_at)
        .bind(&audit.created_by)
        .bind(&audit.updated_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(team.into())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name, created_at, updated_at, created_by, updated_by FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(team.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<TeamId>) -> Result<HashMap<Self::Id, TeamDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let teams = sqlx::query_as::<_, Team>(
            "SELECT id, name, created_at, updated_at, created_by, updated_by FROM teams WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(teams.into_iter().map(|t| (t.id, TeamDBResponse::from(t))).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut qb = QueryBuilder::new("SELECT id, name, created_at, updated_at, created_by, updated_by FROM teams");
        push_order_by(&mut qb, &filter.order);
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.skip);

        let teams = qb.build_query_as::<Team>().fetch_all(&mut *self.db).await?;
        Ok(teams.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn count(&mut self, _filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams").fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Members of a deleted team are detached, not deleted (`ON DELETE SET NULL`).
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(actor = %actor), err)]
    async fn update(&mut self, actor: &Actor, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let mut team = sqlx::query_as::<_, Team>(
            "SELECT id, name, created_at, updated_at, created_by, updated_by FROM teams WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(name) = &request.name {
            team.name = name.clone();
        }
        team.audit.touch(actor, Utc::now());

        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams SET name = $2, updated_at = $3, updated_by = $4
            WHERE id = $1
            RETURNING id, name, created_at, updated_at, created_by, updated_by
            "#,
        )
        .bind(id)
        .bind(&team.name)
        .bind(team.audit.updated_at)
        .bind(&team.audit.updated_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(team.into())
    }
}

impl<'c> Teams<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Ids of the members in a team, ascending.
    #[instrument(skip(self), err)]
    pub async fn member_ids(&mut self, team_id: TeamId) -> Result<Vec<MemberId>> {
        let ids: Vec<MemberId> = sqlx::query_scalar("SELECT id FROM members WHERE team_id = $1 ORDER BY id ASC")
            .bind(team_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(ids)
    }

    /// Member ids for several teams in one query. Teams without members map to an empty list.
    #[instrument(skip(self, team_ids), fields(count = team_ids.len()), err)]
    pub async fn members_bulk(&mut self, team_ids: &[TeamId]) -> Result<HashMap<TeamId, Vec<MemberId>>> {
        let mut result: HashMap<TeamId, Vec<MemberId>> = team_ids.iter().map(|id| (*id, Vec::new())).collect();
        if team_ids.is_empty() {
            return Ok(result);
        }

        let rows: Vec<(TeamId, MemberId)> =
            sqlx::query_as("SELECT team_id, id FROM members WHERE team_id = ANY($1) ORDER BY team_id, id ASC")
                .bind(team_ids.to_vec())
                .fetch_all(&mut *self.db)
                .await?;

        for (team_id, member_id) in rows {
            result.entry(team_id).or_default().push(member_id);
        }

        Ok(result)
    }
}
