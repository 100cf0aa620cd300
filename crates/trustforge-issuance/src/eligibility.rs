//! Issuer eligibility gate.
//!
//! Run before any new certificate is signed. The checks are ordered;
//! the first failure wins and maps to a dedicated error variant.
//! None of these represent transient conditions, so callers must not
//! retry them.

use chrono::{DateTime, Utc};
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::certificate::Certificate;
use trustforge_core::repository::CertificateRepository;

use crate::chain::ChainVerifier;

/// Validate that `issuer` may sign a new certificate right now.
///
/// `for_ca` is true when the requested certificate is itself a CA,
/// which additionally forbids issuers whose path length budget is
/// exhausted.
pub async fn ensure_eligible<R: CertificateRepository>(
    verifier: &ChainVerifier<R>,
    issuer: &Certificate,
    for_ca: bool,
    now: DateTime<Utc>,
) -> CaResult<()> {
    // 1. A revoked issuer signs nothing.
    if issuer.revoked {
        return Err(CaError::IssuerRevoked);
    }

    // 2. The issuer must be inside its own validity window.
    if !issuer.is_within_validity(now) {
        return Err(CaError::IssuerTimeInvalid);
    }

    // 3. Only CA certificates may sign.
    if !issuer.kind.is_ca() {
        return Err(CaError::IssuerNotCa);
    }

    // 4. pathLen 0 forbids further CA delegation beneath the issuer.
    if for_ca && issuer.path_len == Some(0) {
        return Err(CaError::PathLenBlocksCa);
    }

    // 5. The issuer's full chain must verify up to a self-signed root.
    if !verifier.verify(issuer.id).await? {
        return Err(CaError::ChainSignatureInvalid);
    }

    Ok(())
}
