use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

// Postgres SQLSTATE codes this service cares about.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";
const QUERY_CANCELED: &str = "57014";

/// Translate a driver error into the repository error taxonomy.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    match db.code().as_deref() {
        Some(UNIQUE_VIOLATION) => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        Some(FOREIGN_KEY_VIOLATION) | Some(NOT_NULL_VIOLATION) => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        Some(CHECK_VIOLATION) => RepoError::Integrity {
            message: db.message().to_string(),
        },
        Some(QUERY_CANCELED) => RepoError::Timeout,
        _ => RepoError::from_persistence(db.message()),
    }
}
