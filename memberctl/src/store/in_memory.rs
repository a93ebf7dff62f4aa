//! In-memory store implementation.
//!
//! Members and teams live in ordered maps behind a single lock. Suitable for development and
//! tests; everything is lost on restart. Constraint failures are reported with the same
//! [`DbError`] variants and constraint names the PostgreSQL schema produces.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::Store;
use crate::api::models::members::MemberSortField;
use crate::api::models::pagination::Order;
use crate::api::models::teams::TeamSortField;
use crate::audit::AuditStamp;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    members::{MemberCreateDBRequest, MemberDBResponse, MemberUpdateDBRequest},
    teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest},
};
use crate::types::{Actor, MemberId, TeamId, TeamLoading};

#[derive(Default)]
struct State {
    members: BTreeMap<MemberId, MemberDBResponse>,
    teams: BTreeMap<TeamId, TeamDBResponse>,
    last_member_id: MemberId,
    last_team_id: TeamId,
}

impl State {
    fn check_team(&self, team_id: Option<TeamId>) -> Result<()> {
        match team_id {
            Some(id) if !self.teams.contains_key(&id) => Err(DbError::ForeignKeyViolation {
                constraint: Some("members_team_id_fkey".to_string()),
                table: Some("members".to_string()),
                message: format!("team {id} does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn check_team_name(&self, name: &str, except: Option<TeamId>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DbError::CheckViolation {
                constraint: Some("teams_name_not_blank".to_string()),
                table: Some("teams".to_string()),
                message: "team name must not be blank".to_string(),
            });
        }
        if self.teams.values().any(|t| t.name == name && Some(t.id) != except) {
            return Err(DbError::UniqueViolation {
                constraint: Some("teams_name_key".to_string()),
                table: Some("teams".to_string()),
                message: format!("team name '{name}' already exists"),
                conflicting_value: Some(name.to_string()),
            });
        }
        Ok(())
    }

    fn with_team(&self, member: &MemberDBResponse, team_loading: TeamLoading) -> MemberDBResponse {
        let mut member = member.clone();
        if team_loading.is_eager() {
            member.team = member.team_id.and_then(|id| self.teams.get(&id)).cloned();
        }
        member
    }
}

fn check_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(DbError::CheckViolation {
            constraint: Some("members_username_not_blank".to_string()),
            table: Some("members".to_string()),
            message: "username must not be blank".to_string(),
        });
    }
    Ok(())
}

fn compare_members(a: &MemberDBResponse, b: &MemberDBResponse, order: &[Order<MemberSortField>]) -> Ordering {
    order
        .iter()
        .map(|o| {
            let ordering = match o.field {
                MemberSortField::Id => a.id.cmp(&b.id),
                MemberSortField::Username => a.username.cmp(&b.username),
                MemberSortField::Age => a.age.cmp(&b.age),
                MemberSortField::CreatedAt => a.audit.created_at.cmp(&b.audit.created_at),
                MemberSortField::UpdatedAt => a.audit.updated_at.cmp(&b.audit.updated_at),
            };
            o.direction.apply(ordering)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_teams(a: &TeamDBResponse, b: &TeamDBResponse, order: &[Order<TeamSortField>]) -> Ordering {
    order
        .iter()
        .map(|o| {
            let ordering = match o.field {
                TeamSortField::Id => a.id.cmp(&b.id),
                TeamSortField::Name => a.name.cmp(&b.name),
                TeamSortField::CreatedAt => a.audit.created_at.cmp(&b.audit.created_at),
            };
            o.direction.apply(ordering)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn window<T>(mut items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(0);
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(offset..).take(limit).collect()
}

/// In-memory implementation of the [`Store`] trait.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn page_members(&self, offset: i64, limit: i64, order: &[Order<MemberSortField>]) -> Result<Vec<MemberDBResponse>> {
        let state = self.state.read();
        let mut members: Vec<MemberDBResponse> = state.members.values().cloned().collect();
        members.sort_by(|a, b| compare_members(a, b, order));
        Ok(window(members, offset, limit))
    }

    async fn count_members(&self) -> Result<i64> {
        Ok(self.state.read().members.len() as i64)
    }

    async fn get_member(&self, id: MemberId, team_loading: TeamLoading) -> Result<Option<MemberDBResponse>> {
        let state = self.state.read();
        Ok(state.members.get(&id).map(|m| state.with_team(m, team_loading)))
    }

    async fn create_member(&self, actor: &Actor, request: &MemberCreateDBRequest) -> Result<MemberDBResponse> {
        check_username(&request.username)?;

        let mut state = self.state.write();
        state.check_team(request.team_id)?;

        state.last_member_id += 1;
        let member = MemberDBResponse {
            id: state.last_member_id,
            username: request.username.clone(),
            age: request.age,
            team_id: request.team_id,
            team: None,
            audit: AuditStamp::now(actor),
        };
        state.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn create_members(&self, actor: &Actor, requests: &[MemberCreateDBRequest]) -> Result<Vec<MemberDBResponse>> {
        let mut state = self.state.write();
        // Check everything before the first insert
        for request in requests {
            check_username(&request.username)?;
            state.check_team(request.team_id)?;
        }

        let audit = AuditStamp::now(actor);
        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            state.last_member_id += 1;
            let member = MemberDBResponse {
                id: state.last_member_id,
                username: request.username.clone(),
                age: request.age,
                team_id: request.team_id,
                team: None,
                audit: audit.clone(),
            };
            state.members.insert(member.id, member.clone());
            created.push(member);
        }
        Ok(created)
    }

    async fn update_member(&self, actor: &Actor, id: MemberId, request: &MemberUpdateDBRequest) -> Result<MemberDBResponse> {
        if let Some(username) = &request.username {
            check_username(username)?;
        }

        let mut state = self.state.write();
        if let Some(team_id) = request.team_id {
            state.check_team(team_id)?;
        }

        let member = state.members.get_mut(&id).ok_or(DbError::NotFound)?;
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
        Ok(member.clone())
    }

    async fn delete_member(&self, id: MemberId) -> Result<bool> {
        Ok(self.state.write().members.remove(&id).is_some())
    }

    async fn page_teams(&self, offset: i64, limit: i64, order: &[Order<TeamSortField>]) -> Result<Vec<TeamDBResponse>> {
        let state = self.state.read();
        let mut teams: Vec<TeamDBResponse> = state.teams.values().cloned().collect();
        teams.sort_by(|a, b| compare_teams(a, b, order));
        Ok(window(teams, offset, limit))
    }

    async fn count_teams(&self) -> Result<i64> {
        Ok(self.state.read().teams.len() as i64)
    }

    async fn get_team(&self, id: TeamId) -> Result<Option<TeamDBResponse>> {
        Ok(self.state.read().teams.get(&id).cloned())
    }

    async fn create_team(&self, actor: &Actor, request: &TeamCreateDBRequest) -> Result<TeamDBResponse> {
        let mut state = self.state.write();
        state.check_team_name(&request.name, None)?;

        state.last_team_id += 1;
        let team = TeamDBResponse {
            id: state.last_team_id,
            name: request.name.clone(),
            audit: AuditStamp::now(actor),
        };
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn update_team(&self, actor: &Actor, id: TeamId, request: &TeamUpdateDBRequest) -> Result<TeamDBResponse> {
        let mut state = self.state.write();
        if !state.teams.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if let Some(name) = &request.name {
            state.check_team_name(name, Some(id))?;
        }

        let team = state.teams.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = &request.name {
            team.name = name.clone();
        }
        team.audit.touch(actor, Utc::now());
        Ok(team.clone())
    }

    async fn delete_team(&self, id: TeamId) -> Result<bool> {
        let mut state = self.state.write();
        if state.teams.remove(&id).is_none() {
            return Ok(false);
        }
        // ON DELETE SET NULL
        for member in state.members.values_mut().filter(|m| m.team_id == Some(id)) {
            member.team_id = None;
        }
        Ok(true)
    }

    async fn member_ids(&self, team_id: TeamId) -> Result<Vec<MemberId>> {
        let state = self.state.read();
        if !state.teams.contains_key(&team_id) {
            return Err(DbError::NotFound);
        }
        Ok(state.members.values().filter(|m| m.team_id == Some(team_id)).map(|m| m.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new("tester")
    }

    async fn store_with(names: &[(&str, i32)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for (name, age) in names {
            store.create_member(&actor(), &MemberCreateDBRequest::new(*name, *age)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let store = store_with(&[("a", 1), ("b", 2)]).await;
        let all = store.page_members(0, 10, &[Order::asc(MemberSortField::Id)]).await.unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);

        store.delete_member(2).await.unwrap();
        let next = store.create_member(&actor(), &MemberCreateDBRequest::new("c", 3)).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_page_sorts_with_tiebreak_and_windows() {
        let store = store_with(&[("b", 30), ("a", 20), ("b", 10), ("c", 20)]).await;

        let order = [Order::asc(MemberSortField::Username), Order::asc(MemberSortField::Id)];
        let page = store.page_members(1, 2, &order).await.unwrap();
        let ids: Vec<_> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let order = [Order::desc(MemberSortField::Age), Order::asc(MemberSortField::Id)];
        let page = store.page_members(0, 10, &order).await.unwrap();
        let ids: Vec<_> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);

        assert!(store.page_members(10, 2, &order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_username_rejected() {
        let store = InMemoryStore::new();
        let result = store.create_member(&actor(), &MemberCreateDBRequest::new("  ", 1)).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
        assert_eq!(store.count_members().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_team_rejected() {
        let store = InMemoryStore::new();
        let result = store
            .create_member(&actor(), &MemberCreateDBRequest::new("a", 1).with_team(7))
            .await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_team_name_rejected() {
        let store = InMemoryStore::new();
        store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await.unwrap();
        let result = store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await;
        match result {
            Err(DbError::UniqueViolation { conflicting_value, .. }) => assert_eq!(conflicting_value.as_deref(), Some("teamA")),
            other => panic!("expected unique violation, got {other:?}"),
        }

        // Renaming a team to its own name is not a conflict
        let renamed = store
            .update_team(
                &actor(),
                1,
                &TeamUpdateDBRequest {
                    name: Some("teamA".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "teamA");
    }

    #[tokio::test]
    async fn test_create_members_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let team = store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await.unwrap();

        let batch = vec![
            MemberCreateDBRequest::new("a", 1).with_team(team.id),
            MemberCreateDBRequest::new("b", 2).with_team(99),
            MemberCreateDBRequest::new("c", 3),
        ];
        let result = store.create_members(&actor(), &batch).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
        assert_eq!(store.count_members().await.unwrap(), 0);

        let created = store.create_members(&actor(), &batch[..1]).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, 1);
        assert_eq!(store.member_ids(team.id).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_team_loading() {
        let store = InMemoryStore::new();
        let team = store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await.unwrap();
        let member = store
            .create_member(&actor(), &MemberCreateDBRequest::new("a", 1).with_team(team.id))
            .await
            .unwrap();

        let lazy = store.get_member(member.id, TeamLoading::Lazy).await.unwrap().unwrap();
        assert_eq!(lazy.team_id, Some(team.id));
        assert!(lazy.team.is_none());

        let eager = store.get_member(member.id, TeamLoading::Eager).await.unwrap().unwrap();
        assert_eq!(eager.team, Some(team));
    }

    #[tokio::test]
    async fn test_delete_team_detaches_members() {
        let store = InMemoryStore::new();
        let team = store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await.unwrap();
        for name in ["a", "b"] {
            store
                .create_member(&actor(), &MemberCreateDBRequest::new(name, 1).with_team(team.id))
                .await
                .unwrap();
        }
        assert_eq!(store.member_ids(team.id).await.unwrap(), vec![1, 2]);

        assert!(store.delete_team(team.id).await.unwrap());
        assert!(!store.delete_team(team.id).await.unwrap());
        assert_eq!(store.count_members().await.unwrap(), 2);
        let member = store.get_member(1, TeamLoading::Lazy).await.unwrap().unwrap();
        assert_eq!(member.team_id, None);
        assert!(matches!(store.member_ids(team.id).await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_clear_team_on_update() {
        let store = InMemoryStore::new();
        let team = store.create_team(&actor(), &TeamCreateDBRequest::new("teamA")).await.unwrap();
        let member = store
            .create_member(&actor(), &MemberCreateDBRequest::new("a", 1).with_team(team.id))
            .await
            .unwrap();

        let updated = store
            .update_member(
                &actor(),
                member.id,
                &MemberUpdateDBRequest {
                    team_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.team_id, None);
        assert!(store.member_ids(team.id).await.unwrap().is_empty());
    }
}
