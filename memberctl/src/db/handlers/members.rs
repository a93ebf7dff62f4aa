//! Database repository for members.
//!
//! Besides the [`Repository`] operations this exposes named finders for the query shapes the
//! service needs: counts and existence checks, list binding, paged and sorted reads, bulk
//! updates, join projections, read-only and locking reads. Team loading is always chosen by the
//! caller through [`TeamLoading`].

use crate::api::models::members::MemberSortField;
use crate::api::models::pagination::{Order, PageRequest};
use crate::audit::AuditStamp;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, push_order_by},
    models::{
        members::{MemberCreateDBRequest, MemberDBResponse, MemberSummary, MemberUpdateDBRequest},
        teams::TeamDBResponse,
    },
};
use crate::types::{Actor, MemberId, TeamId, TeamLoading};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

const MEMBER_COLUMNS: &str = "m.id, m.username, m.age, m.team_id, m.created_at, m.updated_at, m.created_by, m.updated_by";

const TEAM_COLUMNS: &str = "t.name AS team_name, t.created_at AS team_created_at, t.updated_at AS team_updated_at, \
                            t.created_by AS team_created_by, t.updated_by AS team_updated_by";

/// Filter for listing members
#[derive(Debug, Clone)]
pub struct MemberFilter {
    pub skip: i64,
    pub limit: i64,
    pub order: Vec<Order<MemberSortField>>,
    pub team_id: Option<TeamId>,
    pub age: Option<i32>,
    pub team_loading: TeamLoading,
}

impl MemberFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            order: vec![Order::asc(MemberSortField::Id)],
            team_id: None,
            age: None,
            team_loading: TeamLoading::Lazy,
        }
    }

    /// Filter matching a page request, including the id tie-break.
    pub fn from_page(request: &PageRequest<MemberSortField>) -> Self {
        Self {
            order: request.order_with_tiebreak(),
            ..Self::new(request.offset(), request.size())
        }
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_team_loading(mut self, team_loading: TeamLoading) -> Self {
        self.team_loading = team_loading;
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Member {
    pub id: MemberId,
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

// Member row joined with its team's columns
#[derive(Debug, Clone, FromRow)]
struct MemberWithTeam {
    #[sqlx(flatten)]
    pub member: Member,
    pub team_name: Option<String>,
    pub team_created_at: Option<DateTime<Utc>>,
    pub team_updated_at: Option<DateTime<Utc>>,
    pub team_created_by: Option<String>,
    pub team_updated_by: Option<String>,
}

impl From<Member> for MemberDBResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            username: member.username,
            age: member.age,
            team_id: member.team_id,
            team: None,
            audit: member.audit,
        }
    }
}

impl From<MemberWithTeam> for MemberDBResponse {
    fn from(row: MemberWithTeam) -> Self {
        let team = match (
            row.member.team_id,
            row.team_name,
            row.team_created_at,
            row.team_updated_at,
            row.team_created_by,
            row.team_updated_by,
        ) {
            (Some(id), Some(name), Some(created_at), Some(updated_at), Some(created_by), Some(updated_by)) => Some(TeamDBResponse {
                id,
                name,
                audit: AuditStamp {
                    created_at,
                    updated_at,
                    created_by,
                    updated_by,
                },
            }),
            _ => None,
        };

        Self {
            team,
            ..MemberDBResponse::from(row.member)
        }
    }
}

pub struct Members<'c> {
    db: &'c mut PgConnection,
}

fn select_members(team_loading: TeamLoading) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(MEMBER_COLUMNS);
    if team_loading.is_eager() {
        qb.push(", ");
        qb.push(TEAM_COLUMNS);
        qb.push(" FROM members m LEFT JOIN teams t ON t.id = m.team_id");
    } else {
        qb.push(" FROM members m");
    }
    qb
}

fn push_filter_predicate(qb: &mut QueryBuilder<'_, Postgres>, filter: &MemberFilter) {
    let mut sep = " WHERE ";
    if let Some(team_id) = filter.team_id {
        qb.push(sep).push("m.team_id = ").push_bind(team_id);
        sep = " AND ";
    }
    if let Some(age) = filter.age {
        qb.push(sep).push("m.age = ").push_bind(age);
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Members<'c> {
    type CreateRequest = MemberCreateDBRequest;
    type UpdateRequest = MemberUpdateDBRequest;
    type Response = MemberDBResponse;
    type Id = MemberId;
    type Filter = MemberFilter;

    #[instrument(skip(self, request), fields(actor = %actor, username = %request.username), err)]
    async fn create(&mut self, actor: &Actor, request: &Self::CreateRequest) -> Result<Self::Response> {
        let audit = AuditStamp::now(actor);

        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (username, age, team_id, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, age, team_id, created_at, updated_at, created_by, updated_by
            "#,
        )
        .bind(&request.username)
        .bind(request.age)
        .bind(request.team_id)
        .bind(audit.created_at)
        .bind(audit.updated_at)
        .bind(&audit.created_by)
        .bind(&audit.updated_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(member.into())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        self.find_with_team(id, TeamLoading::Lazy).await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<MemberId>) -> Result<HashMap<Self::Id, MemberDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.id = ANY(").push_bind(ids).push(")");
        let members = qb.build_query_as::<Member>().fetch_all(&mut *self.db).await?;

        Ok(members.into_iter().map(|m| (m.id, MemberDBResponse::from(m))).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip, eager = filter.team_loading.is_eager()), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut qb = select_members(filter.team_loading);
        push_filter_predicate(&mut qb, filter);
        push_order_by(&mut qb, &filter.order);
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.skip);

        let members = if filter.team_loading.is_eager() {
            qb.build_query_as::<MemberWithTeam>()
                .fetch_all(&mut *self.db)
                .await?
                .into_iter()
                .map(MemberDBResponse::from)
                .collect()
        } else {
            qb.build_query_as::<Member>()
                .fetch_all(&mut *self.db)
                .await?
                .into_iter()
                .map(MemberDBResponse::from)
                .collect()
        };

        Ok(members)
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM members m");
        push_filter_predicate(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(actor = %actor), err)]
    async fn update(&mut self, actor: &Actor, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        // Lock the row so the read-modify-write below is atomic
        let mut member = sqlx::query_as::<_, Member>(
            "SELECT id, username, age, team_id, created_at, updated_at, created_by, updated_by FROM members WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(username) = &request.username {
            member.username = username.clone();
        }
        if let Some(age) = request.age {
            member.age = age;
        }
        if let Some(team_id) = request.team_id {
            member.team_id = team_id;
        }
        member.audit.touch(actor, Utc::now());

        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                username = $2,
                age = $3,
                team_id = $4,
                updated_at = $5,
                updated_by = $6
            WHERE id = $1
            RETURNING id, username, age, team_id, created_at, updated_at, created_by, updated_by
            "#,
        )
        .bind(id)
        .bind(&member.username)
        .bind(member.age)
        .bind(member.team_id)
        .bind(member.audit.updated_at)
        .bind(&member.audit.updated_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member.into())
    }
}

impl<'c> Members<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fetch a member, loading its team as requested.
    #[instrument(skip(self), fields(eager = team_loading.is_eager()), err)]
    pub async fn find_with_team(&mut self, id: MemberId, team_loading: TeamLoading) -> Result<Option<MemberDBResponse>> {
        let mut qb = select_members(team_loading);
        qb.push(" WHERE m.id = ").push_bind(id);

        let member = if team_loading.is_eager() {
            qb.build_query_as::<MemberWithTeam>()
                .fetch_optional(&mut *self.db)
                .await?
                .map(MemberDBResponse::from)
        } else {
            qb.build_query_as::<Member>()
                .fetch_optional(&mut *self.db)
                .await?
                .map(MemberDBResponse::from)
        };

        Ok(member)
    }

    /// Whether a member with this id exists
    #[instrument(skip(self), err)]
    pub async fn exists(&mut self, id: MemberId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self), err)]
    pub async fn count_by_username(&mut self, username: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE username = $1")
            .bind(username)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Single-result lookup. When several members share the name, the oldest one wins.
    #[instrument(skip(self), err)]
    pub async fn find_by_username(&mut self, username: &str) -> Result<Option<MemberDBResponse>> {
        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.username = ").push_bind(username.to_string());
        qb.push(" ORDER BY m.id ASC LIMIT 1");

        let member = qb.build_query_as::<Member>().fetch_optional(&mut *self.db).await?;
        Ok(member.map(MemberDBResponse::from))
    }

    /// All members with this exact username
    #[instrument(skip(self), err)]
    pub async fn find_list_by_username(&mut self, username: &str) -> Result<Vec<MemberDBResponse>> {
        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.username = ").push_bind(username.to_string());
        qb.push(" ORDER BY m.id ASC");

        let members = qb.build_query_as::<Member>().fetch_all(&mut *self.db).await?;
        Ok(members.into_iter().map(MemberDBResponse::from).collect())
    }

    /// Members whose username is any of `usernames`
    #[instrument(skip(self, usernames), fields(count = usernames.len()), err)]
    pub async fn find_by_usernames(&mut self, usernames: &[String]) -> Result<Vec<MemberDBResponse>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.username = ANY(").push_bind(usernames.to_vec()).push(")");
        qb.push(" ORDER BY m.id ASC");

        let members = qb.build_query_as::<Member>().fetch_all(&mut *self.db).await?;
        Ok(members.into_iter().map(MemberDBResponse::from).collect())
    }

    /// One page of the members of a given age, with the total number of such members.
    #[instrument(skip(self, request), fields(page = request.page(), size = request.size()), err)]
    pub async fn find_by_age(&mut self, age: i32, request: &PageRequest<MemberSortField>) -> Result<(Vec<MemberDBResponse>, i64)> {
        let filter = MemberFilter::from_page(request).with_age(age);
        let members = self.list(&filter).await?;
        let total = self.count(&filter).await?;
        Ok((members, total))
    }

    /// Add one to the age of every member at least `min_age` old, in a single statement.
    /// Returns the number of rows changed.
    #[instrument(skip(self), fields(actor = %actor), err)]
    pub async fn bulk_age_plus(&mut self, actor: &Actor, min_age: i32) -> Result<u64> {
        let stamp = AuditStamp::now(actor);
        let result = sqlx::query("UPDATE members SET age = age + 1, updated_at = $2, updated_by = $3 WHERE age >= $1")
            .bind(min_age)
            .bind(stamp.updated_at)
            .bind(&stamp.updated_by)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Join projection of every member with its team's name.
    #[instrument(skip(self), err)]
    pub async fn find_summaries(&mut self) -> Result<Vec<MemberSummary>> {
        let summaries = sqlx::query_as::<_, MemberSummary>(
            "SELECT m.id, m.username, t.name AS team_name FROM members m LEFT JOIN teams t ON t.id = m.team_id ORDER BY m.id ASC",
        )
        .fetch_all(&mut *self.db)
        .await?;
        Ok(summaries)
    }

    /// Lookup inside a `READ ONLY` transaction; the database rejects any write attempted in it.
    #[instrument(skip(self), err)]
    pub async fn find_read_only_by_username(&mut self, username: &str) -> Result<Option<MemberDBResponse>> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await?;

        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.username = ").push_bind(username.to_string());
        qb.push(" ORDER BY m.id ASC LIMIT 1");
        let member = qb.build_query_as::<Member>().fetch_optional(&mut *tx).await?;

        tx.commit().await?;
        Ok(member.map(MemberDBResponse::from))
    }

    /// Locking read (`SELECT ... FOR UPDATE`). The locks last until the surrounding
    /// transaction ends, so call this on a transaction's connection.
    #[instrument(skip(self), err)]
    pub async fn find_by_username_for_update(&mut self, username: &str) -> Result<Vec<MemberDBResponse>> {
        let mut qb = select_members(TeamLoading::Lazy);
        qb.push(" WHERE m.username = ").push_bind(username.to_string());
        qb.push(" ORDER BY m.id ASC FOR UPDATE");

        let members = qb.build_query_as::<Member>().fetch_all(&mut *self.db).await?;
        Ok(members.into_iter().map(MemberDBResponse::from).collect())
    }

    /// Every member, via a hand-written statement.
    #[instrument(skip(self), err)]
    pub async fn find_all_raw(&mut self) -> Result<Vec<MemberDBResponse>> {
        let members = sqlx::query_as::<_, Member>(
            "SELECT id, username, age, team_id, created_at, updated_at, created_by, updated_by FROM members ORDER BY id ASC",
        )
        .fetch_all(&mut *self.db)
        .await?;
        Ok(members.into_iter().map(MemberDBResponse::from).collect())
    }

    /// Move a member to another team, or out of its team with `None`.
    #[instrument(skip(self), fields(actor = %actor), err)]
    pub async fn change_team(&mut self, actor: &Actor, id: MemberId, team_id: Option<TeamId>) -> Result<MemberDBResponse> {
        let request = MemberUpdateDBRequest {
            team_id: Some(team_id),
            ..Default::default()
        };
        self.update(actor, id, &request).await
    }
}
