//! API request and response data models.
//!
//! These structures define the public HTTP contract. They are distinct from the database
//! models in [`crate::db::models`] and convert from them with `From`. All of them carry
//! `utoipa` annotations for the generated OpenAPI document.
//!
//! - [`members`]: Member create/update payloads, listing and detail projections
//! - [`teams`]: Team payloads and responses
//! - [`pagination`]: Page requests, sort parsing and the [`pagination::Page`] envelope

pub mod members;
pub mod pagination;
pub mod teams;
