//! SurrealDB implementation of [`OperatorRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use trustforge_core::error::CaResult;
use trustforge_core::models::operator::{NewOperator, Operator};
use trustforge_core::repository::OperatorRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OperatorRow {
    name: String,
    organization: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl OperatorRow {
    fn into_operator(self, id: Uuid) -> Operator {
        Operator {
            id,
            name: self.name,
            organization: self.organization,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// SurrealDB implementation of the operator repository.
#[derive(Clone)]
pub struct SurrealOperatorRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOperatorRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OperatorRepository for SurrealOperatorRepository<C> {
    async fn create(&self, input: NewOperator) -> CaResult<Operator> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('operator', $id) SET \
                 name = $name, \
                 organization = $organization, \
                 is_admin = $is_admin",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("organization", input.organization))
            .bind(("is_admin", input.is_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("operator", e))?;

        let rows: Vec<OperatorRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "operator".into(),
            id: id_str,
        })?;

        Ok(row.into_operator(id))
    }

    async fn get_by_id(&self, id: Uuid) -> CaResult<Operator> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('operator', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OperatorRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "operator".into(),
            id: id_str,
        })?;

        Ok(row.into_operator(id))
    }
}
