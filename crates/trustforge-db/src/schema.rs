//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Unique indexes are the
//! enforcement point for serial number uniqueness and CSR
//! deduplication.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Operators
-- =======================================================================
DEFINE TABLE operator SCHEMAFULL;
DEFINE FIELD name ON TABLE operator TYPE string;
DEFINE FIELD organization ON TABLE operator TYPE string;
DEFINE FIELD is_admin ON TABLE operator TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE operator TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Certificates
-- =======================================================================
DEFINE TABLE certificate SCHEMAFULL;
DEFINE FIELD serial_hex ON TABLE certificate TYPE string;
DEFINE FIELD subject ON TABLE certificate TYPE string;
DEFINE FIELD kind ON TABLE certificate TYPE string \
    ASSERT $value IN ['Root', 'Intermediate', 'EndEntity'];
DEFINE FIELD pem ON TABLE certificate TYPE string;
DEFINE FIELD chain_pem ON TABLE certificate TYPE string;
DEFINE FIELD fingerprint ON TABLE certificate TYPE string;
DEFINE FIELD parent_id ON TABLE certificate TYPE option<string>;
DEFINE FIELD chain_root_id ON TABLE certificate TYPE string;
DEFINE FIELD owner_id ON TABLE certificate TYPE string;
DEFINE FIELD not_before ON TABLE certificate TYPE datetime;
DEFINE FIELD not_after ON TABLE certificate TYPE datetime;
DEFINE FIELD path_len ON TABLE certificate TYPE option<int>;
DEFINE FIELD csr_hash ON TABLE certificate TYPE option<string>;
DEFINE FIELD revoked ON TABLE certificate TYPE bool DEFAULT false;
DEFINE FIELD revoked_at ON TABLE certificate TYPE option<datetime>;
DEFINE FIELD revocation_reason ON TABLE certificate \
    TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['Unspecified', \
    'KeyCompromise', 'CaCompromise', 'AffiliationChanged', \
    'Superseded', 'CessationOfOperation', 'PrivilegeWithdrawn'];
DEFINE FIELD revocation_comment ON TABLE certificate \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE certificate TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_certificate_serial ON TABLE certificate \
    COLUMNS serial_hex UNIQUE;
DEFINE INDEX idx_certificate_fingerprint ON TABLE certificate \
    COLUMNS fingerprint UNIQUE;
DEFINE INDEX idx_certificate_owner ON TABLE certificate \
    COLUMNS owner_id;
DEFINE INDEX idx_certificate_parent ON TABLE certificate \
    COLUMNS parent_id;

-- =======================================================================
-- Signed CSR ledger (per-CA deduplication)
-- =======================================================================
DEFINE TABLE issued_csr SCHEMAFULL;
DEFINE FIELD ca_id ON TABLE issued_csr TYPE string;
DEFINE FIELD csr_hash ON TABLE issued_csr TYPE string;
DEFINE FIELD created_at ON TABLE issued_csr TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_issued_csr_ca_hash ON TABLE issued_csr \
    COLUMNS ca_id, csr_hash UNIQUE;

-- =======================================================================
-- Key custody records
-- =======================================================================
DEFINE TABLE custody_record SCHEMAFULL;
DEFINE FIELD certificate_id ON TABLE custody_record TYPE string;
DEFINE FIELD owner_id ON TABLE custody_record TYPE string;
DEFINE FIELD alias ON TABLE custody_record TYPE string;
DEFINE FIELD wrapped_password ON TABLE custody_record TYPE string;
DEFINE FIELD wrap_key_version ON TABLE custody_record TYPE int;
DEFINE FIELD active ON TABLE custody_record TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE custody_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_custody_certificate ON TABLE custody_record \
    COLUMNS certificate_id;
DEFINE INDEX idx_custody_owner ON TABLE custody_record \
    COLUMNS owner_id;

-- =======================================================================
-- Operator wrap keys
-- =======================================================================
DEFINE TABLE wrap_key SCHEMAFULL;
DEFINE FIELD operator_id ON TABLE wrap_key TYPE string;
DEFINE FIELD version ON TABLE wrap_key TYPE int;
DEFINE FIELD protected_key ON TABLE wrap_key TYPE string;
DEFINE FIELD created_at ON TABLE wrap_key TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_wrap_key_operator_version ON TABLE wrap_key \
    COLUMNS operator_id, version UNIQUE;

-- =======================================================================
-- Chain assignments
-- =======================================================================
DEFINE TABLE chain_assignment SCHEMAFULL;
DEFINE FIELD operator_id ON TABLE chain_assignment TYPE string;
DEFINE FIELD chain_root_id ON TABLE chain_assignment TYPE string;
DEFINE FIELD assigned_by ON TABLE chain_assignment \
    TYPE option<string>;
DEFINE FIELD active ON TABLE chain_assignment TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE chain_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_assignment_operator_root ON TABLE chain_assignment \
    COLUMNS operator_id, chain_root_id UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
