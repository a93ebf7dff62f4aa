//! The store the service runs against.
//!
//! HTTP handlers, the seeder and the listing service only see the [`Store`] trait. Two backends
//! implement it:
//!
//! - [`postgres::PostgresStore`]: a SQLx pool plus the repositories in [`crate::db::handlers`]
//! - [`in_memory::InMemoryStore`]: process-local maps, lost on restart; used for development and tests
//!
//! Both backends stamp audit columns through [`crate::audit::AuditStamp`], assign ids in
//! increasing order, reject unknown team references, and detach members when their team is
//! deleted.

use crate::api::models::members::MemberSortField;
use crate::api::models::pagination::Order;
use crate::api::models::teams::TeamSortField;
use crate::db::errors::Result;
use crate::db::models::{
    members::{MemberCreateDBRequest, MemberDBResponse, MemberUpdateDBRequest},
    teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest},
};
use crate::types::{Actor, MemberId, TeamId, TeamLoading};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Storage operations used by the rest of the service.
///
/// Every mutating call takes the acting identity explicitly.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Short backend name, for logs.
    fn backend(&self) -> &'static str;

    /// Up to `limit` members starting at `offset`, in the given order.
    async fn page_members(&self, offset: i64, limit: i64, order: &[Order<MemberSortField>]) -> Result<Vec<MemberDBResponse>>;

    async fn count_members(&self) -> Result<i64>;

    async fn get_member(&self, id: MemberId, team_loading: TeamLoading) -> Result<Option<MemberDBResponse>>;

    async fn create_member(&self, actor: &Actor, request: &MemberCreateDBRequest) -> Result<MemberDBResponse>;

    /// Create several members atomically: either every request is inserted or none is.
    async fn create_members(&self, actor: &Actor, requests: &[MemberCreateDBRequest]) -> Result<Vec<MemberDBResponse>>;

    async fn update_member(&self, actor: &Actor, id: MemberId, request: &MemberUpdateDBRequest) -> Result<MemberDBResponse>;

    async fn delete_member(&self, id: MemberId) -> Result<bool>;

    /// Up to `limit` teams starting at `offset`, in the given order.
    async fn page_teams(&self, offset: i64, limit: i64, order: &[Order<TeamSortField>]) -> Result<Vec<TeamDBResponse>>;

    async fn count_teams(&self) -> Result<i64>;

    async fn get_team(&self, id: TeamId) -> Result<Option<TeamDBResponse>>;

    async fn create_team(&self, actor: &Actor, request: &TeamCreateDBRequest) -> Result<TeamDBResponse>;

    async fn update_team(&self, actor: &Actor, id: TeamId, request: &TeamUpdateDBRequest) -> Result<TeamDBResponse>;

    /// Delete a team. Its members stay, with their team cleared.
    async fn delete_team(&self, id: TeamId) -> Result<bool>;

    /// Ids of a team's members, ascending.
    async fn member_ids(&self, team_id: TeamId) -> Result<Vec<MemberId>>;
}
