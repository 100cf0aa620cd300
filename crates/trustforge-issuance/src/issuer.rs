//! CA issuance orchestration — root creation and intermediate
//! delegation.

use chrono::{Duration, Utc};
use tracing::info;
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::assignment::NewChainAssignment;
use trustforge_core::models::certificate::{Certificate, CertificateKind, NewCertificate};
use trustforge_core::repository::{
    CertificateRepository, ChainAssignmentRepository, CustodyRepository, OperatorRepository,
    WrapKeyRepository,
};
use trustforge_vault::{KeyProtector, KeyVault};
use trustforge_x509::builder::{self, CaCertParams};
use trustforge_x509::{DistinguishedName, KeyUsageFlags, SerialNumber};
use uuid::Uuid;

use crate::chain::ChainVerifier;
use crate::config::IssuanceConfig;
use crate::eligibility;

/// Input for creating a self-signed root CA.
#[derive(Debug)]
pub struct CreateRootInput {
    pub subject: DistinguishedName,
    pub validity_days: i64,
    pub path_len: Option<u32>,
    pub key_usage: KeyUsageFlags,
}

/// Input for issuing an intermediate CA under an existing issuer.
#[derive(Debug)]
pub struct IssueIntermediateInput {
    pub issuer_certificate_id: Uuid,
    pub subject: DistinguishedName,
    pub validity_days: i64,
    pub path_len: Option<u32>,
    pub key_usage: KeyUsageFlags,
    /// The operator the new certificate (and its key) belongs to.
    pub target_operator_id: Uuid,
    /// The operator performing the issuance.
    pub acting_operator_id: Uuid,
    /// Whether the acting operator holds platform administrator
    /// rights. Enforced by the caller.
    pub acting_is_admin: bool,
}

/// CA issuance orchestrator.
///
/// Generic over repository implementations so the issuance layer has
/// no dependency on the database crate.
pub struct IssuanceService<C, A, O, K, W, P>
where
    C: CertificateRepository + Clone,
    A: ChainAssignmentRepository,
    O: OperatorRepository,
    K: CustodyRepository,
    W: WrapKeyRepository,
    P: KeyProtector,
{
    certs: C,
    verifier: ChainVerifier<C>,
    assignments: A,
    operators: O,
    vault: KeyVault<K, W, P>,
    config: IssuanceConfig,
}

impl<C, A, O, K, W, P> IssuanceService<C, A, O, K, W, P>
where
    C: CertificateRepository + Clone,
    A: ChainAssignmentRepository,
    O: OperatorRepository,
    K: CustodyRepository,
    W: WrapKeyRepository,
    P: KeyProtector,
{
    pub fn new(
        certs: C,
        assignments: A,
        operators: O,
        vault: KeyVault<K, W, P>,
        config: IssuanceConfig,
    ) -> Self {
        let verifier = ChainVerifier::new(certs.clone());
        Self {
            certs,
            verifier,
            assignments,
            operators,
            vault,
            config,
        }
    }

    /// Create a self-signed root CA and take custody of its key under
    /// the administrator who requested it.
    pub async fn create_root(
        &self,
        input: CreateRootInput,
        admin_id: Uuid,
    ) -> CaResult<Certificate> {
        if input.validity_days <= 0 {
            return Err(CaError::Validation {
                message: "validity_days must be positive".into(),
            });
        }

        // 1. Build the certificate. notBefore is backdated to absorb
        //    clock skew.
        let now = Utc::now();
        let params = CaCertParams {
            subject: input.subject,
            serial: SerialNumber::generate()?,
            not_before: now - Duration::minutes(self.config.backdate_minutes),
            not_after: now + Duration::days(input.validity_days),
            path_len: input.path_len,
            key_usage: input.key_usage,
        };
        let (key, cert) = builder::create_self_signed_root(&params)?;

        // 2. Persist. Roots anchor their own chain, so the chain PEM
        //    is the certificate itself.
        let pem = trustforge_x509::chain::to_pem(&cert)?;
        let fingerprint = trustforge_x509::chain::fingerprint_hex(&cert)?;
        let stored = self
            .certs
            .create(NewCertificate {
                serial_hex: params.serial.hex().to_string(),
                subject: params.subject.to_string(),
                kind: CertificateKind::Root,
                pem: pem.clone(),
                chain_pem: pem,
                fingerprint,
                parent_id: None,
                chain_root_id: None,
                owner_id: admin_id,
                not_before: params.not_before,
                not_after: params.not_after,
                path_len: input.path_len,
                csr_hash: None,
            })
            .await?;

        // 3. Archive the key. A failed archive must not leave a
        //    certificate row without custody.
        if let Err(e) = self
            .vault
            .store(admin_id, stored.id, &cert, &key, &[])
            .await
        {
            self.certs.remove(stored.id).await?;
            return Err(e);
        }

        info!(
            certificate_id = %stored.id,
            serial = %stored.serial_hex,
            "Root CA created"
        );

        Ok(stored)
    }

    /// Issue an intermediate CA under an existing issuer.
    pub async fn issue_intermediate(
        &self,
        input: IssueIntermediateInput,
    ) -> CaResult<Certificate> {
        if input.validity_days <= 0 {
            return Err(CaError::Validation {
                message: "validity_days must be positive".into(),
            });
        }

        let now = Utc::now();

        // 1. Eligibility gate against the issuer.
        let issuer = self.certs.get_by_id(input.issuer_certificate_id).await?;
        eligibility::ensure_eligible(&self.verifier, &issuer, true, now).await?;

        // 2. Authorization for non-administrators.
        if !input.acting_is_admin {
            if issuer.kind == CertificateKind::Root {
                return Err(CaError::Unauthorized {
                    reason: "issuing under a root CA requires administrator rights".into(),
                });
            }

            if self
                .assignments
                .get_active(input.acting_operator_id, issuer.chain_root_id)
                .await?
                .is_none()
            {
                return Err(CaError::Unauthorized {
                    reason: "no active assignment for this trust chain".into(),
                });
            }

            if input.target_operator_id != input.acting_operator_id {
                let acting = self.operators.get_by_id(input.acting_operator_id).await?;
                let target = self.operators.get_by_id(input.target_operator_id).await?;
                if acting.organization != target.organization {
                    return Err(CaError::Unauthorized {
                        reason: "cross-operator issuance requires a shared organization".into(),
                    });
                }
            }
        }

        // 3. The issuer's key is unlocked via the custody record's
        //    owner, who must be the acting operator for non-admins.
        let custody = self
            .vault
            .active_custody(issuer.id)
            .await?
            .ok_or_else(|| CaError::Keystore("issuer has no active custody record".into()))?;

        if !input.acting_is_admin && custody.owner_id != input.acting_operator_id {
            return Err(CaError::Unauthorized {
                reason: "issuer key is held by another operator".into(),
            });
        }

        let unlocked = self.vault.load(&custody).await?;

        // 4. Build, clamping notAfter to the issuer's window.
        let not_after = (now + Duration::days(input.validity_days)).min(issuer.not_after);
        let params = CaCertParams {
            subject: input.subject,
            serial: SerialNumber::generate()?,
            not_before: now - Duration::minutes(self.config.backdate_minutes),
            not_after,
            path_len: input.path_len,
            key_usage: input.key_usage,
        };
        let (key, cert) = builder::create_intermediate(&params, &unlocked.cert, &unlocked.key)?;

        // 5. Persist with parent and chain-root links.
        let pem = trustforge_x509::chain::to_pem(&cert)?;
        let chain_pem = trustforge_x509::chain::prepend_to_chain(&pem, &issuer.chain_pem);
        let fingerprint = trustforge_x509::chain::fingerprint_hex(&cert)?;
        let stored = self
            .certs
            .create(NewCertificate {
                serial_hex: params.serial.hex().to_string(),
                subject: params.subject.to_string(),
                kind: CertificateKind::Intermediate,
                pem,
                chain_pem,
                fingerprint,
                parent_id: Some(issuer.id),
                chain_root_id: Some(issuer.chain_root_id),
                owner_id: input.target_operator_id,
                not_before: params.not_before,
                not_after: params.not_after,
                path_len: input.path_len,
                csr_hash: None,
            })
            .await?;

        // 6. Custody under the target operator, compensating on
        //    failure so no key-less certificate row survives.
        let issuer_chain = trustforge_x509::chain::parse_chain(&issuer.chain_pem)?;
        if let Err(e) = self
            .vault
            .store(
                input.target_operator_id,
                stored.id,
                &cert,
                &key,
                &issuer_chain,
            )
            .await
        {
            self.certs.remove(stored.id).await?;
            return Err(e);
        }

        // 7. The target operator must be able to issue under this
        //    chain from now on.
        if self
            .assignments
            .get_active(input.target_operator_id, issuer.chain_root_id)
            .await?
            .is_none()
        {
            self.assignments
                .create(NewChainAssignment {
                    operator_id: input.target_operator_id,
                    chain_root_id: issuer.chain_root_id,
                    assigned_by: Some(input.acting_operator_id),
                })
                .await?;
        }

        info!(
            certificate_id = %stored.id,
            issuer_id = %issuer.id,
            target_operator = %input.target_operator_id,
            "Intermediate CA issued"
        );

        Ok(stored)
    }

    /// Every CA certificate in the system. Administrator view.
    pub async fn all_ca_certificates(&self) -> CaResult<Vec<Certificate>> {
        self.certs.list_cas().await
    }

    /// The intermediate CA certificates an operator may actually use:
    /// restricted to their assigned chain roots AND to certificates
    /// whose key custody they hold. Roots are never included.
    pub async fn operator_ca_certificates(&self, operator_id: Uuid) -> CaResult<Vec<Certificate>> {
        let assigned_roots = self.assignments.list_roots_for_operator(operator_id).await?;
        let owned: Vec<Uuid> = self
            .vault
            .custody_by_owner(operator_id)
            .await?
            .into_iter()
            .map(|r| r.certificate_id)
            .collect();

        let intermediates = self.certs.list_intermediates().await?;
        Ok(intermediates
            .into_iter()
            .filter(|c| assigned_roots.contains(&c.chain_root_id) && owned.contains(&c.id))
            .collect())
    }
}
