//! SurrealDB implementation of [`WrapKeyRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use trustforge_core::error::CaResult;
use trustforge_core::models::custody::{NewOperatorWrapKey, OperatorWrapKey};
use trustforge_core::repository::WrapKeyRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct WrapKeyRow {
    operator_id: String,
    version: u32,
    protected_key: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct WrapKeyRowWithId {
    record_id: String,
    operator_id: String,
    version: u32,
    protected_key: String,
    created_at: DateTime<Utc>,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Query(format!("invalid {field} UUID: {e}")))
}

impl WrapKeyRow {
    fn into_key(self, id: Uuid) -> Result<OperatorWrapKey, DbError> {
        Ok(OperatorWrapKey {
            id,
            operator_id: parse_uuid("operator", &self.operator_id)?,
            version: self.version,
            protected_key: self.protected_key,
            created_at: self.created_at,
        })
    }
}

impl WrapKeyRowWithId {
    fn try_into_key(self) -> Result<OperatorWrapKey, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        Ok(OperatorWrapKey {
            id,
            operator_id: parse_uuid("operator", &self.operator_id)?,
            version: self.version,
            protected_key: self.protected_key,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the wrap key repository.
#[derive(Clone)]
pub struct SurrealWrapKeyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWrapKeyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WrapKeyRepository for SurrealWrapKeyRepository<C> {
    async fn create(&self, input: NewOperatorWrapKey) -> CaResult<OperatorWrapKey> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('wrap_key', $id) SET \
                 operator_id = $operator_id, \
                 version = $version, \
                 protected_key = $protected_key",
            )
            .bind(("id", id_str.clone()))
            .bind(("operator_id", input.operator_id.to_string()))
            .bind(("version", input.version))
            .bind(("protected_key", input.protected_key))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("wrap_key", e))?;

        let rows: Vec<WrapKeyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "wrap_key".into(),
            id: id_str,
        })?;

        Ok(row.into_key(id)?)
    }

    async fn get_latest(&self, operator_id: Uuid) -> CaResult<Option<OperatorWrapKey>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM wrap_key \
                 WHERE operator_id = $operator_id \
                 ORDER BY version DESC LIMIT 1",
            )
            .bind(("operator_id", operator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WrapKeyRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_key().map_err(DbError::from)?)),
            None => Ok(None),
        }
    }

    async fn get_by_version(&self, operator_id: Uuid, version: u32) -> CaResult<OperatorWrapKey> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM wrap_key \
                 WHERE operator_id = $operator_id AND version = $version",
            )
            .bind(("operator_id", operator_id.to_string()))
            .bind(("version", version))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WrapKeyRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "wrap_key".into(),
            id: format!("operator={operator_id} version={version}"),
        })?;

        Ok(row.try_into_key()?)
    }
}
