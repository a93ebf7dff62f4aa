//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or transaction), constructs its queries at runtime
//! with bound parameters, and returns the models in [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Members`]: Members, their paged listings and the named finders
//! - [`Teams`]: Teams and their member lists
//!
//! # Common Pattern
//!
//! ```ignore
//! use memberctl::db::handlers::{Members, Repository};
//!
//! async fn example(pool: &sqlx::PgPool, actor: &Actor) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Members::new(&mut tx);
//!
//!     let member = repo.create(actor, &MemberCreateDBRequest::new("member1", 10)).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod members;
pub mod repository;
pub mod teams;

pub use members::Members;
pub use repository::Repository;
pub use teams::Teams;
