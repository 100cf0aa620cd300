//! Database-specific error types and conversions.

use trustforge_core::error::CaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated on {entity}: {detail}")]
    Conflict { entity: String, detail: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify a statement-level error, surfacing unique index
    /// violations as conflicts.
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let detail = err.to_string();
        if detail.contains("already contains") {
            DbError::Conflict {
                entity: entity.into(),
                detail,
            }
        } else {
            DbError::Query(detail)
        }
    }
}

impl From<DbError> for CaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CaError::NotFound { entity, id },
            DbError::Conflict { entity, detail } => CaError::Conflict { entity, detail },
            other => CaError::Database(other.to_string()),
        }
    }
}
