//! Certificate domain models.
//!
//! TRUSTFORGE maintains a hierarchical PKI: self-signed roots sign
//! intermediate CAs, which in turn sign end-entity certificates from
//! CSRs. Every certificate keeps a link to its parent and to the root
//! of its chain so that trust can be re-verified at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of a certificate in the hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CertificateKind {
    /// Self-signed trust anchor.
    Root,
    /// CA certificate signed by a root or another intermediate.
    Intermediate,
    /// Leaf certificate signed from a CSR. Never a CA.
    EndEntity,
}

impl CertificateKind {
    /// Whether certificates of this kind may sign other certificates.
    pub fn is_ca(&self) -> bool {
        matches!(self, CertificateKind::Root | CertificateKind::Intermediate)
    }
}

/// RFC 5280 CRL reason codes, surfaced in OCSP responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    PrivilegeWithdrawn,
}

impl RevocationReason {
    /// Numeric reason code as defined by RFC 5280.
    pub fn code(&self) -> u32 {
        match self {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::PrivilegeWithdrawn => 6,
        }
    }
}

/// A certificate tracked by the engine.
///
/// The PEM of the certificate itself and the concatenated PEM of its
/// full chain (leaf first) are both persisted, so chain verification
/// and export never need to re-walk the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    /// Uppercase hex serial number (16 random bytes, positive).
    pub serial_hex: String,
    /// The certificate subject (e.g., `CN=ACME Root CA, O=ACME`).
    pub subject: String,
    pub kind: CertificateKind,
    /// PEM-encoded certificate.
    pub pem: String,
    /// Concatenated PEM chain: this certificate first, then each
    /// ancestor up to and including the root.
    pub chain_pem: String,
    /// SHA-256 fingerprint of the certificate, hex-encoded.
    pub fingerprint: String,
    /// The certificate that signed this one. `None` for roots.
    pub parent_id: Option<Uuid>,
    /// The root of this certificate's chain. Roots point at themselves.
    pub chain_root_id: Uuid,
    /// The operator this certificate was issued to.
    pub owner_id: Uuid,
    /// Validity start.
    pub not_before: DateTime<Utc>,
    /// Validity end.
    pub not_after: DateTime<Utc>,
    /// Path length constraint, when present on a CA certificate.
    pub path_len: Option<u32>,
    /// SHA-256 hash of the CSR DER, for end-entity certificates.
    pub csr_hash: Option<String>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<RevocationReason>,
    /// Free-text note recorded at revocation time.
    pub revocation_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Certificate {
    /// Whether `now` falls inside the certificate's validity window.
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

/// Fields required to persist a newly built certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCertificate {
    pub serial_hex: String,
    pub subject: String,
    pub kind: CertificateKind,
    pub pem: String,
    pub chain_pem: String,
    pub fingerprint: String,
    pub parent_id: Option<Uuid>,
    /// `None` for roots — the repository points the new row at itself.
    pub chain_root_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub path_len: Option<u32>,
    pub csr_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cert_with_window(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Certificate {
        Certificate {
            id: Uuid::new_v4(),
            serial_hex: "00".into(),
            subject: "CN=test".into(),
            kind: CertificateKind::Root,
            pem: String::new(),
            chain_pem: String::new(),
            fingerprint: String::new(),
            parent_id: None,
            chain_root_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            not_before,
            not_after,
            path_len: None,
            csr_hash: None,
            revoked: false,
            revoked_at: None,
            revocation_reason: None,
            revocation_comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn validity_window_bounds_are_inclusive() {
        let now = Utc::now();
        let cert = cert_with_window(now, now + Duration::days(1));
        assert!(cert.is_within_validity(now));
        assert!(cert.is_within_validity(now + Duration::days(1)));
        assert!(!cert.is_within_validity(now - Duration::seconds(1)));
        assert!(!cert.is_within_validity(now + Duration::days(2)));
    }

    #[test]
    fn reason_codes_follow_rfc_5280() {
        assert_eq!(RevocationReason::Unspecified.code(), 0);
        assert_eq!(RevocationReason::KeyCompromise.code(), 1);
        assert_eq!(RevocationReason::PrivilegeWithdrawn.code(), 6);
    }

    #[test]
    fn only_ca_kinds_may_sign() {
        assert!(CertificateKind::Root.is_ca());
        assert!(CertificateKind::Intermediate.is_ca());
        assert!(!CertificateKind::EndEntity.is_ca());
    }
}
