//! HTTP request handlers, one module per resource.
//!
//! - [`members`]: paginated member listing and member CRUD
//! - [`teams`]: paginated team listing and team CRUD
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching HTTP status and body.
//! Writes take the acting identity from [`crate::api::actor::CurrentActor`].

pub mod members;
pub mod teams;

/// Split an `include` query parameter into its comma-separated entries.
pub fn parse_includes(include: Option<&str>) -> Vec<&str> {
    include
        .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}
