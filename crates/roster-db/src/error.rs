//! Database-specific error types and conversions.

use roster_auth::AuthError;
use roster_core::error::RosterError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error(transparent)]
    Credential(#[from] AuthError),
}

impl From<DbError> for RosterError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => RosterError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => RosterError::AlreadyExists { entity },
            DbError::Credential(e) => e.into(),
            other => RosterError::Database(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// Map a failed statement, turning unique-index violations into
/// [`DbError::Duplicate`].
pub(crate) fn statement_error(entity: &str, err: surrealdb::Error) -> DbError {
    let detail = err.to_string();
    if detail.contains("already contains") {
        DbError::Duplicate {
            entity: entity.into(),
            detail,
        }
    } else {
        DbError::Query(detail)
    }
}
