//! End-entity issuance from certificate signing requests, plus
//! revocation.

use chrono::{DateTime, Utc};
use openssl::pkey::Id;
use tracing::info;
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::certificate::{
    Certificate, CertificateKind, NewCertificate, RevocationReason,
};
use trustforge_core::repository::{CertificateRepository, CustodyRepository, WrapKeyRepository};
use trustforge_vault::{KeyProtector, KeyVault};
use trustforge_x509::builder::{self, LeafParams};
use trustforge_x509::{SerialNumber, csr};
use uuid::Uuid;

use crate::config::{CsrPolicy, ValidityPolicy};

/// Input for signing a leaf certificate from a CSR.
#[derive(Debug)]
pub struct SignCsrInput {
    pub csr_pem: String,
    /// The CA selected to sign the request.
    pub ca_id: Uuid,
    /// Requested validity start; defaults to now.
    pub not_before: Option<DateTime<Utc>>,
    /// Requested validity end; defaults to the policy's validity
    /// period.
    pub not_after: Option<DateTime<Utc>>,
    pub requesting_operator_id: Uuid,
}

/// A signed leaf certificate, ready to hand back to the requester.
#[derive(Debug)]
pub struct SignedCsr {
    pub certificate_pem: String,
    pub ca_pem: String,
    pub serial_hex: String,
}

/// A CA available for issuer selection.
#[derive(Debug, Clone)]
pub struct CaSummary {
    pub id: Uuid,
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// CSR signing service.
///
/// Generic over repository implementations so the signing layer has
/// no dependency on the database crate.
pub struct CsrSigningService<C, K, W, P>
where
    C: CertificateRepository,
    K: CustodyRepository,
    W: WrapKeyRepository,
    P: KeyProtector,
{
    certs: C,
    vault: KeyVault<K, W, P>,
    policy: CsrPolicy,
}

impl<C, K, W, P> CsrSigningService<C, K, W, P>
where
    C: CertificateRepository,
    K: CustodyRepository,
    W: WrapKeyRepository,
    P: KeyProtector,
{
    pub fn new(certs: C, vault: KeyVault<K, W, P>, policy: CsrPolicy) -> Self {
        Self {
            certs,
            vault,
            policy,
        }
    }

    /// Sign a leaf certificate from a PEM-encoded CSR.
    pub async fn sign_csr(&self, input: SignCsrInput) -> CaResult<SignedCsr> {
        let now = Utc::now();

        // 1. The request must parse and carry a valid self-signature.
        let req = csr::parse_and_verify(&input.csr_pem)?;

        // 2. Key strength policy: RSA only, at or above the minimum
        //    modulus size.
        let req_key = req
            .public_key()
            .map_err(|e| CaError::Validation {
                message: format!("CSR public key is unusable: {e}"),
            })?;
        if req_key.id() != Id::RSA {
            return Err(CaError::Validation {
                message: "only RSA keys are accepted".into(),
            });
        }
        let bits = csr::key_bits(&req)?;
        if bits < self.policy.min_rsa_bits {
            return Err(CaError::Validation {
                message: format!(
                    "RSA key of {bits} bits is below the {} bit minimum",
                    self.policy.min_rsa_bits
                ),
            });
        }

        // 3. The selected CA must exist and be a CA.
        let ca = self.certs.get_by_id(input.ca_id).await?;
        if !ca.kind.is_ca() {
            return Err(CaError::IssuerNotCa);
        }

        // 4. Resolve the validity window against the CA's own.
        let requested_nb = input.not_before.unwrap_or(now);
        let requested_na = input
            .not_after
            .unwrap_or(now + chrono::Duration::days(self.policy.default_validity_days));

        let (not_before, not_after) = match self.policy.validity_policy {
            ValidityPolicy::Clamp => {
                (requested_nb.max(ca.not_before), requested_na.min(ca.not_after))
            }
            ValidityPolicy::Reject => {
                if requested_nb < ca.not_before || requested_na > ca.not_after {
                    return Err(CaError::Validation {
                        message: "requested validity exceeds the issuing CA's window".into(),
                    });
                }
                (requested_nb, requested_na)
            }
        };
        if not_before >= not_after {
            return Err(CaError::Validation {
                message: "resolved validity window is inverted".into(),
            });
        }

        // 5. Unlock the CA key and sign.
        let custody = self
            .vault
            .active_custody(ca.id)
            .await?
            .ok_or_else(|| CaError::Keystore("CA has no active custody record".into()))?;
        let unlocked = self.vault.load(&custody).await?;

        let serial = SerialNumber::generate()?;
        let leaf = builder::sign_leaf_from_csr(
            &LeafParams {
                serial: serial.clone(),
                not_before,
                not_after,
                ocsp_url: self.policy.ocsp_url.clone(),
            },
            &req,
            &unlocked.cert,
            &unlocked.key,
        )?;

        let pem = trustforge_x509::chain::to_pem(&leaf)?;
        let chain_pem = trustforge_x509::chain::prepend_to_chain(&pem, &ca.chain_pem);
        let fingerprint = trustforge_x509::chain::fingerprint_hex(&leaf)?;

        // 6. Dedup: the same CSR is signed by the same CA exactly
        //    once. The claim is taken insert-time right before
        //    persistence, so an attempt that failed earlier in the
        //    flow leaves nothing behind and can be retried.
        let csr_hash = csr::hash_hex(&req)?;
        self.certs.claim_csr(ca.id, &csr_hash).await?;

        // 7. Persist as an end-entity certificate carrying the CSR
        //    hash, releasing the claim if the row cannot be created.
        let created = self
            .certs
            .create(NewCertificate {
                serial_hex: serial.hex().to_string(),
                subject: trustforge_x509::name::encoded_name_to_string(leaf.subject_name()),
                kind: CertificateKind::EndEntity,
                pem: pem.clone(),
                chain_pem,
                fingerprint,
                parent_id: Some(ca.id),
                chain_root_id: Some(ca.chain_root_id),
                owner_id: input.requesting_operator_id,
                not_before,
                not_after,
                path_len: None,
                csr_hash: Some(csr_hash.clone()),
            })
            .await;
        let stored = match created {
            Ok(stored) => stored,
            Err(e) => {
                self.certs.release_csr(ca.id, &csr_hash).await?;
                return Err(e);
            }
        };

        info!(
            certificate_id = %stored.id,
            ca_id = %ca.id,
            serial = %stored.serial_hex,
            "Leaf certificate signed from CSR"
        );

        Ok(SignedCsr {
            certificate_pem: pem,
            ca_pem: ca.pem,
            serial_hex: stored.serial_hex,
        })
    }

    /// Intermediate CAs available for issuer selection.
    pub async fn cas(&self) -> CaResult<Vec<CaSummary>> {
        let intermediates = self.certs.list_intermediates().await?;
        Ok(intermediates
            .into_iter()
            .map(|c| CaSummary {
                id: c.id,
                subject: c.subject,
                not_before: c.not_before,
                not_after: c.not_after,
            })
            .collect())
    }

    /// Certificates issued to the given operator.
    pub async fn operator_certificates(&self, operator_id: Uuid) -> CaResult<Vec<Certificate>> {
        self.certs.list_by_owner(operator_id).await
    }

    /// Revoke a certificate. Only the certificate's own subject may
    /// revoke it, and only once — revocation is a one-way transition.
    pub async fn revoke(
        &self,
        certificate_id: Uuid,
        reason: RevocationReason,
        comment: Option<String>,
        requesting_operator_id: Uuid,
    ) -> CaResult<Certificate> {
        let cert = self.certs.get_by_id(certificate_id).await?;

        if cert.owner_id != requesting_operator_id {
            return Err(CaError::Unauthorized {
                reason: "only the certificate's subject may revoke it".into(),
            });
        }
        if cert.revoked {
            return Err(CaError::Conflict {
                entity: "certificate".into(),
                detail: "already revoked".into(),
            });
        }

        let revoked = self
            .certs
            .mark_revoked(certificate_id, Utc::now(), reason, comment)
            .await?;

        info!(
            certificate_id = %certificate_id,
            reason = ?reason,
            "Certificate revoked"
        );

        Ok(revoked)
    }
}
