//! SurrealDB implementation of [`ChainAssignmentRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use trustforge_core::error::CaResult;
use trustforge_core::models::assignment::{ChainAssignment, NewChainAssignment};
use trustforge_core::repository::ChainAssignmentRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    operator_id: String,
    chain_root_id: String,
    assigned_by: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    operator_id: String,
    chain_root_id: String,
    assigned_by: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ChainRootRow {
    chain_root_id: String,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Query(format!("invalid {field} UUID: {e}")))
}

impl AssignmentRow {
    fn into_assignment(self, id: Uuid) -> Result<ChainAssignment, DbError> {
        Ok(ChainAssignment {
            id,
            operator_id: parse_uuid("operator", &self.operator_id)?,
            chain_root_id: parse_uuid("chain root", &self.chain_root_id)?,
            assigned_by: self
                .assigned_by
                .as_deref()
                .map(|v| parse_uuid("assigner", v))
                .transpose()?,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<ChainAssignment, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        Ok(ChainAssignment {
            id,
            operator_id: parse_uuid("operator", &self.operator_id)?,
            chain_root_id: parse_uuid("chain root", &self.chain_root_id)?,
            assigned_by: self
                .assigned_by
                .as_deref()
                .map(|v| parse_uuid("assigner", v))
                .transpose()?,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the chain assignment repository.
#[derive(Clone)]
pub struct SurrealChainAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChainAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ChainAssignmentRepository for SurrealChainAssignmentRepository<C> {
    async fn create(&self, input: NewChainAssignment) -> CaResult<ChainAssignment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('chain_assignment', $id) SET \
                 operator_id = $operator_id, \
                 chain_root_id = $chain_root_id, \
                 assigned_by = $assigned_by, \
                 active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("operator_id", input.operator_id.to_string()))
            .bind(("chain_root_id", input.chain_root_id.to_string()))
            .bind(("assigned_by", input.assigned_by.map(|a| a.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("chain_assignment", e))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "chain_assignment".into(),
            id: id_str,
        })?;

        Ok(row.into_assignment(id)?)
    }

    async fn get_active(
        &self,
        operator_id: Uuid,
        chain_root_id: Uuid,
    ) -> CaResult<Option<ChainAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM chain_assignment \
                 WHERE operator_id = $operator_id \
                 AND chain_root_id = $chain_root_id \
                 AND active = true",
            )
            .bind(("operator_id", operator_id.to_string()))
            .bind(("chain_root_id", chain_root_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_assignment().map_err(DbError::from)?)),
            None => Ok(None),
        }
    }

    async fn list_roots_for_operator(&self, operator_id: Uuid) -> CaResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT chain_root_id FROM chain_assignment \
                 WHERE operator_id = $operator_id AND active = true",
            )
            .bind(("operator_id", operator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChainRootRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| parse_uuid("chain root", &row.chain_root_id))
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
