use crate::api::models::pagination::PageRequestError;
use crate::db::errors::DbError;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Conflict error, e.g., for unique constraint violations
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The store cannot be reached. Transient; never retried here, clients may retry with backoff.
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::NOT_FOUND,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Conflict { message } => message.clone(),
            Error::Unavailable { .. } => "Service temporarily unavailable, please retry later".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation {
                    constraint,
                    conflicting_value,
                    ..
                } => match (constraint.as_deref(), conflicting_value) {
                    (Some("teams_name_key"), Some(name)) => format!("A team named '{name}' already exists"),
                    (Some("teams_name_key"), None) => "A team with this name already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { constraint, .. } => match constraint.as_deref() {
                    Some("members_team_id_fkey") => "Referenced team does not exist".to_string(),
                    _ => "Invalid reference to related resource".to_string(),
                },
                DbError::CheckViolation { constraint, .. } => match constraint.as_deref() {
                    Some("members_username_not_blank") => "Username must not be empty".to_string(),
                    Some("teams_name_not_blank") => "Team name must not be empty".to_string(),
                    _ => "Invalid data provided".to_string(),
                },
                DbError::Unavailable(_) => "Service temporarily unavailable, please retry later".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            Error::Unavailable { message: err.to_string() }
        } else {
            Error::Database(err)
        }
    }
}

impl From<PageRequestError> for Error {
    fn from(err: PageRequestError) -> Self {
        Error::BadRequest { message: err.to_string() }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unavailable { .. } | Error::Database(DbError::Unavailable(_)) => {
                tracing::warn!("Store unavailable: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            Error::Conflict { .. } | Error::Database(DbError::UniqueViolation { .. }) => {
                let body = json!({ "message": self.user_message() });
                (status, axum::response::Json(body)).into_response()
            }
            Error::Unavailable { .. } | Error::Database(DbError::Unavailable(_)) => {
                (status, [(header::RETRY_AFTER, "1")], self.user_message()).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_db_error_becomes_503() {
        let err: Error = DbError::Unavailable("pool timed out".to_string()).into();
        assert!(matches!(err, Error::Unavailable { .. }));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.user_message().contains("pool"));
    }

    #[test]
    fn test_constraint_errors_map_to_client_statuses() {
        let dup: Error = DbError::UniqueViolation {
            constraint: Some("teams_name_key".to_string()),
            table: Some("teams".to_string()),
            message: "duplicate key".to_string(),
            conflicting_value: Some("teamA".to_string()),
        }
        .into();
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);
        assert_eq!(dup.user_message(), "A team named 'teamA' already exists");

        let fk: Error = DbError::ForeignKeyViolation {
            constraint: Some("members_team_id_fkey".to_string()),
            table: Some("members".to_string()),
            message: "violates foreign key".to_string(),
        }
        .into();
        assert_eq!(fk.status_code(), StatusCode::NOT_FOUND);

        let check: Error = DbError::CheckViolation {
            constraint: Some("members_username_not_blank".to_string()),
            table: Some("members".to_string()),
            message: "violates check".to_string(),
        }
        .into();
        assert_eq!(check.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(check.user_message(), "Username must not be empty");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err: Error = DbError::Other(anyhow::anyhow!("relation \"members\" does not exist")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Database error occurred");
    }

    #[test]
    fn test_page_request_error_message_is_kept() {
        let err: Error = PageRequestError::UnknownSortField("password".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Unknown sort property 'password'");
    }
}
