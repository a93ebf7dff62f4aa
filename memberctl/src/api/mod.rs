//! REST API: handlers, request/response models and extractors.
//!
//! - **Members** (`/members`, `/members/{id}`): paginated listing and CRUD
//! - **Teams** (`/teams`, `/teams/{id}`): paginated listing and CRUD
//!
//! All endpoints are documented with `utoipa`. The OpenAPI document is served at
//! `/api-docs/openapi.json` and rendered at `/docs`.

pub mod actor;
pub mod handlers;
pub mod models;
