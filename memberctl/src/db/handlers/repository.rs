//! Base repository trait for database operations.
//!
//! A repository is a data access layer for a postgres table. It provides methods for creating,
//! reading, updating, and deleting entities, as well as listing them with simple filters.
//!
//! Writes take the acting identity explicitly; repositories stamp the audit columns with it.

use std::collections::HashMap;

use crate::api::models::pagination::{Order, SortField};
use crate::db::errors::Result;
use crate::types::Actor;
use sqlx::{Postgres, QueryBuilder};

/// Append an `ORDER BY` clause. Columns come from the closed [`SortField`] enums, never from
/// user input.
pub(crate) fn push_order_by<F: SortField>(qb: &mut QueryBuilder<'_, Postgres>, orders: &[Order<F>]) {
    if orders.is_empty() {
        return;
    }
    qb.push(" ORDER BY ");
    for (i, order) in orders.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(order.field.column());
        qb.push(" ");
        qb.push(order.direction.as_sql());
    }
}

/// Base repository trait providing common database operations
///
/// This trait has separate associated types for create requests, update requests, and responses.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity, attributed to `actor`
    async fn create(&mut self, actor: &Actor, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Get lots of entities by their IDs, keyed by ID
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Count the entities a filter matches, ignoring its pagination
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64>;

    /// Delete an entity by ID
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Update an entity by ID, attributed to `actor`
    async fn update(&mut self, actor: &Actor, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
