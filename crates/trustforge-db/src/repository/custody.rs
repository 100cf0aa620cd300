//! SurrealDB implementation of [`CustodyRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use trustforge_core::error::CaResult;
use trustforge_core::models::custody::{CustodyRecord, NewCustodyRecord};
use trustforge_core::repository::CustodyRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CustodyRow {
    certificate_id: String,
    owner_id: String,
    alias: String,
    wrapped_password: String,
    wrap_key_version: u32,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CustodyRowWithId {
    record_id: String,
    certificate_id: String,
    owner_id: String,
    alias: String,
    wrapped_password: String,
    wrap_key_version: u32,
    active: bool,
    created_at: DateTime<Utc>,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Query(format!("invalid {field} UUID: {e}")))
}

impl CustodyRow {
    fn into_record(self, id: Uuid) -> Result<CustodyRecord, DbError> {
        Ok(CustodyRecord {
            id,
            certificate_id: parse_uuid("certificate", &self.certificate_id)?,
            owner_id: parse_uuid("owner", &self.owner_id)?,
            alias: self.alias,
            wrapped_password: self.wrapped_password,
            wrap_key_version: self.wrap_key_version,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

impl CustodyRowWithId {
    fn try_into_record(self) -> Result<CustodyRecord, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        Ok(CustodyRecord {
            id,
            certificate_id: parse_uuid("certificate", &self.certificate_id)?,
            owner_id: parse_uuid("owner", &self.owner_id)?,
            alias: self.alias,
            wrapped_password: self.wrapped_password,
            wrap_key_version: self.wrap_key_version,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the custody repository.
#[derive(Clone)]
pub struct SurrealCustodyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCustodyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CustodyRepository for SurrealCustodyRepository<C> {
    async fn create(&self, input: NewCustodyRecord) -> CaResult<CustodyRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // A certificate has one active custody record at a time;
        // deactivate any predecessor before inserting.
        let result = self
            .db
            .query(
                "UPDATE custody_record SET active = false \
                 WHERE certificate_id = $certificate_id AND active = true; \
                 CREATE type::record('custody_record', $id) SET \
                 certificate_id = $certificate_id, \
                 owner_id = $owner_id, \
                 alias = $alias, \
                 wrapped_password = $wrapped_password, \
                 wrap_key_version = $wrap_key_version, \
                 active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("certificate_id", input.certificate_id.to_string()))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("alias", input.alias))
            .bind(("wrapped_password", input.wrapped_password))
            .bind(("wrap_key_version", input.wrap_key_version))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("custody_record", e))?;

        let rows: Vec<CustodyRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "custody_record".into(),
            id: id_str,
        })?;

        Ok(row.into_record(id)?)
    }

    async fn get_active_for_certificate(
        &self,
        certificate_id: Uuid,
    ) -> CaResult<Option<CustodyRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM custody_record \
                 WHERE certificate_id = $certificate_id AND active = true",
            )
            .bind(("certificate_id", certificate_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustodyRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_record().map_err(DbError::from)?)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> CaResult<Vec<CustodyRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM custody_record \
                 WHERE owner_id = $owner_id AND active = true \
                 ORDER BY created_at ASC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustodyRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
