//! SurrealDB implementation of [`CertificateRepository`].
//!
//! Serial and fingerprint uniqueness are enforced by unique indexes;
//! violations surface as conflicts rather than silent overwrites.
//! The `issued_csr` ledger gives CSR deduplication the same
//! insert-time guarantee.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use trustforge_core::error::CaResult;
use trustforge_core::models::certificate::{
    Certificate, CertificateKind, NewCertificate, RevocationReason,
};
use trustforge_core::repository::CertificateRepository;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct CertificateRow {
    serial_hex: String,
    subject: String,
    kind: String,
    pem: String,
    chain_pem: String,
    fingerprint: String,
    parent_id: Option<String>,
    chain_root_id: String,
    owner_id: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    path_len: Option<u32>,
    csr_hash: Option<String>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    revocation_reason: Option<String>,
    revocation_comment: Option<String>,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CertificateRowWithId {
    record_id: String,
    serial_hex: String,
    subject: String,
    kind: String,
    pem: String,
    chain_pem: String,
    fingerprint: String,
    parent_id: Option<String>,
    chain_root_id: String,
    owner_id: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    path_len: Option<u32>,
    csr_hash: Option<String>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    revocation_reason: Option<String>,
    revocation_comment: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<CertificateKind, DbError> {
    match s {
        "Root" => Ok(CertificateKind::Root),
        "Intermediate" => Ok(CertificateKind::Intermediate),
        "EndEntity" => Ok(CertificateKind::EndEntity),
        other => Err(DbError::Query(format!("unknown certificate kind: {other}"))),
    }
}

fn kind_to_string(kind: &CertificateKind) -> &'static str {
    match kind {
        CertificateKind::Root => "Root",
        CertificateKind::Intermediate => "Intermediate",
        CertificateKind::EndEntity => "EndEntity",
    }
}

fn parse_reason(s: &str) -> Result<RevocationReason, DbError> {
    match s {
        "Unspecified" => Ok(RevocationReason::Unspecified),
        "KeyCompromise" => Ok(RevocationReason::KeyCompromise),
        "CaCompromise" => Ok(RevocationReason::CaCompromise),
        "AffiliationChanged" => Ok(RevocationReason::AffiliationChanged),
        "Superseded" => Ok(RevocationReason::Superseded),
        "CessationOfOperation" => Ok(RevocationReason::CessationOfOperation),
        "PrivilegeWithdrawn" => Ok(RevocationReason::PrivilegeWithdrawn),
        other => Err(DbError::Query(format!("unknown revocation reason: {other}"))),
    }
}

fn reason_to_string(reason: &RevocationReason) -> &'static str {
    match reason {
        RevocationReason::Unspecified => "Unspecified",
        RevocationReason::KeyCompromise => "KeyCompromise",
        RevocationReason::CaCompromise => "CaCompromise",
        RevocationReason::AffiliationChanged => "AffiliationChanged",
        RevocationReason::Superseded => "Superseded",
        RevocationReason::CessationOfOperation => "CessationOfOperation",
        RevocationReason::PrivilegeWithdrawn => "PrivilegeWithdrawn",
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Query(format!("invalid {field} UUID: {e}")))
}

impl CertificateRow {
    fn into_certificate(self, id: Uuid) -> Result<Certificate, DbError> {
        let parent_id = self
            .parent_id
            .as_deref()
            .map(|v| parse_uuid("parent", v))
            .transpose()?;
        Ok(Certificate {
            id,
            serial_hex: self.serial_hex,
            subject: self.subject,
            kind: parse_kind(&self.kind)?,
            pem: self.pem,
            chain_pem: self.chain_pem,
            fingerprint: self.fingerprint,
            parent_id,
            chain_root_id: parse_uuid("chain root", &self.chain_root_id)?,
            owner_id: parse_uuid("owner", &self.owner_id)?,
            not_before: self.not_before,
            not_after: self.not_after,
            path_len: self.path_len,
            csr_hash: self.csr_hash,
            revoked: self.revoked,
            revoked_at: self.revoked_at,
            revocation_reason: self
                .revocation_reason
                .as_deref()
                .map(parse_reason)
                .transpose()?,
            revocation_comment: self.revocation_comment,
            created_at: self.created_at,
        })
    }
}

impl CertificateRowWithId {
    fn try_into_certificate(self) -> Result<Certificate, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        let row = CertificateRow {
            serial_hex: self.serial_hex,
            subject: self.subject,
            kind: self.kind,
            pem: self.pem,
            chain_pem: self.chain_pem,
            fingerprint: self.fingerprint,
            parent_id: self.parent_id,
            chain_root_id: self.chain_root_id,
            owner_id: self.owner_id,
            not_before: self.not_before,
            not_after: self.not_after,
            path_len: self.path_len,
            csr_hash: self.csr_hash,
            revoked: self.revoked,
            revoked_at: self.revoked_at,
            revocation_reason: self.revocation_reason,
            revocation_comment: self.revocation_comment,
            created_at: self.created_at,
        };
        row.into_certificate(id)
    }
}

/// SurrealDB implementation of the certificate repository.
#[derive(Clone)]
pub struct SurrealCertificateRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCertificateRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CertificateRepository for SurrealCertificateRepository<C> {
    async fn create(&self, input: NewCertificate) -> CaResult<Certificate> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        // Roots anchor their own chain.
        let chain_root = input.chain_root_id.unwrap_or(id).to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('certificate', $id) SET \
                 serial_hex = $serial_hex, \
                 subject = $subject, \
                 kind = $kind, \
                 pem = $pem, \
                 chain_pem = $chain_pem, \
                 fingerprint = $fingerprint, \
                 parent_id = $parent_id, \
                 chain_root_id = $chain_root_id, \
                 owner_id = $owner_id, \
                 not_before = $not_before, \
                 not_after = $not_after, \
                 path_len = $path_len, \
                 csr_hash = $csr_hash, \
                 revoked = false, \
                 revoked_at = NONE, \
                 revocation_reason = NONE, \
                 revocation_comment = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("serial_hex", input.serial_hex))
            .bind(("subject", input.subject))
            .bind(("kind", kind_to_string(&input.kind).to_string()))
            .bind(("pem", input.pem))
            .bind(("chain_pem", input.chain_pem))
            .bind(("fingerprint", input.fingerprint))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("chain_root_id", chain_root))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("not_before", input.not_before))
            .bind(("not_after", input.not_after))
            .bind(("path_len", input.path_len))
            .bind(("csr_hash", input.csr_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("certificate", e))?;

        let rows: Vec<CertificateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "certificate".into(),
            id: id_str,
        })?;

        Ok(row.into_certificate(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CaResult<Certificate> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('certificate', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "certificate".into(),
            id: id_str,
        })?;

        Ok(row.into_certificate(id)?)
    }

    async fn get_by_serial(&self, serial_hex: &str) -> CaResult<Certificate> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM certificate \
                 WHERE serial_hex = $serial_hex",
            )
            .bind(("serial_hex", serial_hex.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "certificate".into(),
            id: format!("serial={serial_hex}"),
        })?;

        Ok(row.try_into_certificate()?)
    }

    async fn get_by_parent_and_serial(
        &self,
        parent_id: Uuid,
        serial_hex: &str,
    ) -> CaResult<Option<Certificate>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM certificate \
                 WHERE parent_id = $parent_id AND serial_hex = $serial_hex",
            )
            .bind(("parent_id", parent_id.to_string()))
            .bind(("serial_hex", serial_hex.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_certificate().map_err(DbError::from)?)),
            None => Ok(None),
        }
    }

    async fn list_cas(&self) -> CaResult<Vec<Certificate>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM certificate \
                 WHERE kind IN ['Root', 'Intermediate'] \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_certificate())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn list_intermediates(&self) -> CaResult<Vec<Certificate>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM certificate \
                 WHERE kind = 'Intermediate' \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_certificate())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> CaResult<Vec<Certificate>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM certificate \
                 WHERE owner_id = $owner_id \
                 ORDER BY created_at ASC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_certificate())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn claim_csr(&self, ca_id: Uuid, csr_hash: &str) -> CaResult<()> {
        let result = self
            .db
            .query("CREATE issued_csr SET ca_id = $ca_id, csr_hash = $csr_hash")
            .bind(("ca_id", ca_id.to_string()))
            .bind(("csr_hash", csr_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement("issued_csr", e))?;

        Ok(())
    }

    async fn release_csr(&self, ca_id: Uuid, csr_hash: &str) -> CaResult<()> {
        self.db
            .query("DELETE issued_csr WHERE ca_id = $ca_id AND csr_hash = $csr_hash")
            .bind(("ca_id", ca_id.to_string()))
            .bind(("csr_hash", csr_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn mark_revoked(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: RevocationReason,
        comment: Option<String>,
    ) -> CaResult<Certificate> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('certificate', $id) SET \
                 revoked = true, \
                 revoked_at = $revoked_at, \
                 revocation_reason = $reason, \
                 revocation_comment = $comment",
            )
            .bind(("id", id_str.clone()))
            .bind(("revoked_at", revoked_at))
            .bind(("reason", reason_to_string(&reason).to_string()))
            .bind(("comment", comment))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("certificate", e))?;

        let rows: Vec<CertificateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "certificate".into(),
            id: id_str,
        })?;

        Ok(row.into_certificate(id)?)
    }

    async fn remove(&self, id: Uuid) -> CaResult<()> {
        self.db
            .query("DELETE type::record('certificate', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
