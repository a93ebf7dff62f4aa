//! Extractor for the identity performing a write.

use crate::{AppState, errors::Error, types::Actor};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::trace;

/// The acting identity for the current request.
///
/// Read from the header named by `audit.actor_header`. A missing, empty or non-UTF-8 header
/// falls back to `audit.default_actor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let audit = &state.config.audit;
        let from_header = parts
            .headers
            .get(audit.actor_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let actor = match from_header {
            Some(name) => Actor::new(name),
            None => {
                trace!("No actor header, using default actor");
                Actor::new(audit.default_actor.clone())
            }
        };

        Ok(CurrentActor(actor))
    }
}
