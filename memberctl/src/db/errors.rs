use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
        /// The conflicting value that caused the violation (if extractable)
        conflicting_value: Option<String>,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// The store could not be reached. Transient: callers may retry with backoff.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => DbError::Unavailable(err.to_string()),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DbError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().map(|s| s.to_string());

                    let conflicting_value = db_err
                        .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                        .and_then(|pg_err| pg_err.detail())
                        .and_then(|detail| extract_conflicting_name(detail, constraint.as_deref()));

                    DbError::UniqueViolation {
                        constraint,
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                        conflicting_value,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Extract the conflicting team name from a PostgreSQL unique violation detail message.
/// Only applies to the team name constraint.
fn extract_conflicting_name(detail: &str, constraint: Option<&str>) -> Option<String> {
    if constraint == Some("teams_name_key") {
        // "Key (name)=(core) already exists."
        if let Some(start) = detail.find("=(") {
            if let Some(end) = detail[start + 2..].find(')') {
                return Some(detail[start + 2..start + 2 + end].to_string());
            }
        }
    }
    None
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_conflicting_name() {
        assert_eq!(
            extract_conflicting_name("Key (name)=(core) already exists.", Some("teams_name_key")),
            Some("core".to_string())
        );
        assert_eq!(extract_conflicting_name("Key (name)=(core) already exists.", Some("other")), None);
        assert_eq!(extract_conflicting_name("no detail", Some("teams_name_key")), None);
    }

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(DbError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(DbError::from(sqlx::Error::PoolClosed).is_transient());
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound));
        assert!(!DbError::from(sqlx::Error::RowNotFound).is_transient());
    }
}
