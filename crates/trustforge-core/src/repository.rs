//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Services depend on these
//! traits rather than on the database crate, so storage can be
//! swapped out in tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CaResult;
use crate::models::{
    assignment::{ChainAssignment, NewChainAssignment},
    certificate::{Certificate, NewCertificate, RevocationReason},
    custody::{CustodyRecord, NewCustodyRecord, NewOperatorWrapKey, OperatorWrapKey},
    operator::{NewOperator, Operator},
};

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

pub trait CertificateRepository: Send + Sync {
    /// Persist a new certificate. Serial numbers are unique across
    /// the table; a duplicate fails with a conflict.
    fn create(&self, input: NewCertificate) -> impl Future<Output = CaResult<Certificate>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CaResult<Certificate>> + Send;

    fn get_by_serial(&self, serial_hex: &str)
    -> impl Future<Output = CaResult<Certificate>> + Send;

    /// Find a certificate issued by `parent_id` with the given serial.
    fn get_by_parent_and_serial(
        &self,
        parent_id: Uuid,
        serial_hex: &str,
    ) -> impl Future<Output = CaResult<Option<Certificate>>> + Send;

    /// All CA certificates (roots and intermediates).
    fn list_cas(&self) -> impl Future<Output = CaResult<Vec<Certificate>>> + Send;

    /// Intermediate CA certificates only.
    fn list_intermediates(&self) -> impl Future<Output = CaResult<Vec<Certificate>>> + Send;

    /// Certificates issued to the given operator.
    fn list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = CaResult<Vec<Certificate>>> + Send;

    /// Record that a CSR hash has been signed by the given CA.
    /// Fails with a conflict if the same CSR was already signed there.
    fn claim_csr(
        &self,
        ca_id: Uuid,
        csr_hash: &str,
    ) -> impl Future<Output = CaResult<()>> + Send;

    /// Release a claim taken by [`claim_csr`]. Only used to
    /// compensate when signing fails after the claim was recorded,
    /// so the CSR stays signable on retry.
    fn release_csr(
        &self,
        ca_id: Uuid,
        csr_hash: &str,
    ) -> impl Future<Output = CaResult<()>> + Send;

    /// Mark a certificate revoked. Revocation is one-way; the caller
    /// is responsible for rejecting repeat revocations.
    fn mark_revoked(
        &self,
        id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: RevocationReason,
        comment: Option<String>,
    ) -> impl Future<Output = CaResult<Certificate>> + Send;

    /// Remove a certificate row. Only used to compensate when key
    /// custody cannot be stored for a freshly issued certificate.
    fn remove(&self, id: Uuid) -> impl Future<Output = CaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Key custody
// ---------------------------------------------------------------------------

pub trait CustodyRepository: Send + Sync {
    fn create(
        &self,
        input: NewCustodyRecord,
    ) -> impl Future<Output = CaResult<CustodyRecord>> + Send;

    /// The active custody record for a certificate, if any.
    fn get_active_for_certificate(
        &self,
        certificate_id: Uuid,
    ) -> impl Future<Output = CaResult<Option<CustodyRecord>>> + Send;

    /// All active custody records owned by an operator.
    fn list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = CaResult<Vec<CustodyRecord>>> + Send;
}

pub trait WrapKeyRepository: Send + Sync {
    fn create(
        &self,
        input: NewOperatorWrapKey,
    ) -> impl Future<Output = CaResult<OperatorWrapKey>> + Send;

    /// The highest-version wrap key for an operator, if one exists.
    fn get_latest(
        &self,
        operator_id: Uuid,
    ) -> impl Future<Output = CaResult<Option<OperatorWrapKey>>> + Send;

    fn get_by_version(
        &self,
        operator_id: Uuid,
        version: u32,
    ) -> impl Future<Output = CaResult<OperatorWrapKey>> + Send;
}

// ---------------------------------------------------------------------------
// Chain assignments & operators
// ---------------------------------------------------------------------------

pub trait ChainAssignmentRepository: Send + Sync {
    fn create(
        &self,
        input: NewChainAssignment,
    ) -> impl Future<Output = CaResult<ChainAssignment>> + Send;

    /// The active assignment binding an operator to a chain, if any.
    fn get_active(
        &self,
        operator_id: Uuid,
        chain_root_id: Uuid,
    ) -> impl Future<Output = CaResult<Option<ChainAssignment>>> + Send;

    /// Chain roots the operator holds active assignments for.
    fn list_roots_for_operator(
        &self,
        operator_id: Uuid,
    ) -> impl Future<Output = CaResult<Vec<Uuid>>> + Send;
}

pub trait OperatorRepository: Send + Sync {
    fn create(&self, input: NewOperator) -> impl Future<Output = CaResult<Operator>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CaResult<Operator>> + Send;
}
