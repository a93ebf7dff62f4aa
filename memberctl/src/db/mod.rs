//! PostgreSQL data access.
//!
//! This module implements the data access layer for the PostgreSQL store using SQLx.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │    Store    │  (store::PostgresStore - connections & transactions)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - records shared with the in-memory store)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for members and teams
//! - [`models`]: Request and response records
//! - [`errors`]: Database error type, shared by both store backends
//!
//! # Transactions
//!
//! Repositories borrow a `PgConnection`. Writes should run inside a transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Members::new(&mut tx);
//! let member = repo.create(&actor, &request).await?;
//! tx.commit().await?;
//! ```
//!
//! Read-only work can use a plain pooled connection:
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! let (members, total) = Members::new(&mut conn).find_by_age(30, &page).await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in the `migrations/` directory and are applied by [`crate::migrator`] on start-up.

pub mod errors;
pub mod handlers;
pub mod models;
