//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema;

/// Connection settings for the certificate store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint, host and port only (e.g., `127.0.0.1:8000`).
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:8000".into(),
            namespace: "trustforge".into(),
            database: "ca".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the live connection handed to the repositories.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, select the configured namespace and database, and
    /// bring the schema up to date. The returned manager is ready for
    /// repository construction.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let db = Surreal::new::<Ws>(&config.endpoint).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        schema::run_migrations(&db).await?;

        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Certificate store connected"
        );

        Ok(Self { db })
    }

    /// The underlying client, cloned into each repository.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
